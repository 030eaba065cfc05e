use super::common::*;
use crate::address::LookupError;
use crate::leads::domain::{ValuationId, ValuationStatus};
use crate::leads::repository::{RepositoryError, ValuationRepository};
use crate::leads::{LeadServiceError, ValuationLeadService};
use crate::pricing::{PriceSource, NATIONAL_BASELINE_PRICE};
use std::sync::Arc;

#[tokio::test]
async fn request_valuation_persists_completed_figures() {
    let (service, valuations) = build_service();

    let outcome = service
        .request_valuation(submission())
        .await
        .expect("valuation succeeds");

    // offline: baseline x detached (1.4) x four bedrooms (1.3)
    let expected = (NATIONAL_BASELINE_PRICE as f64 * 1.4 * 1.3).round() as u64;
    assert_eq!(outcome.price.source, PriceSource::Baseline);
    assert_eq!(outcome.price.average_price, expected);
    assert_eq!(
        outcome.offer.offer_price + outcome.offer.discount_amount,
        expected as i64
    );

    let stored = valuations
        .fetch(&outcome.valuation.id)
        .expect("fetch succeeds")
        .expect("valuation stored");
    assert_eq!(stored.status, ValuationStatus::Completed);
    assert_eq!(stored.estimated_value, Some(expected));
    assert_eq!(stored.offer_value, Some(outcome.offer.offer_price));
    assert!(stored.min_price <= stored.estimated_value);
    assert!(stored.estimated_value <= stored.max_price);
}

#[tokio::test]
async fn request_valuation_rejects_malformed_postcode() {
    let (service, valuations) = build_service();
    let mut submission = submission();
    submission.postcode = "not-a-postcode".to_string();

    match service.request_valuation(submission).await {
        Err(LeadServiceError::Postcode(LookupError::InvalidPostcodeFormat { .. })) => {}
        other => panic!("expected invalid postcode, got {other:?}"),
    }
    assert!(valuations.recent(10).expect("list").is_empty());
}

#[tokio::test]
async fn request_valuation_rejects_bad_contact_details() {
    let (service, _) = build_service();
    let mut submission = submission();
    submission.contact.email = "ada-at-example".to_string();

    assert!(matches!(
        service.request_valuation(submission).await,
        Err(LeadServiceError::InvalidContact(_))
    ));
}

#[tokio::test]
async fn mark_sent_follows_lifecycle() {
    let (service, _) = build_service();
    let outcome = service
        .request_valuation(submission())
        .await
        .expect("valuation succeeds");

    let sent = service
        .mark_sent(&outcome.valuation.id)
        .expect("completed valuations can be sent");
    assert_eq!(sent.status, ValuationStatus::Sent);

    match service.mark_sent(&outcome.valuation.id) {
        Err(LeadServiceError::InvalidTransition { from, to, .. }) => {
            assert_eq!((from, to), ("sent", "sent"));
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn get_propagates_not_found() {
    let (service, _) = build_service();
    assert!(matches!(
        service.get(&ValuationId("valuation-missing".to_string())),
        Err(LeadServiceError::Repository(RepositoryError::NotFound))
    ));
}

#[tokio::test]
async fn repository_outage_surfaces_as_error() {
    let contacts = Arc::new(MemoryContacts::default());
    let properties = Arc::new(MemoryProperties::default());
    let service = ValuationLeadService::new(
        contacts.clone(),
        properties.clone(),
        Arc::new(UnavailableValuations),
        offline_retriever(),
    );

    assert!(matches!(
        service.request_valuation(submission()).await,
        Err(LeadServiceError::Repository(RepositoryError::Unavailable(_)))
    ));
    assert_eq!(contacts.len(), 0, "no orphaned contact");
    assert_eq!(properties.len(), 0, "no orphaned property");
}

#[test]
fn register_contact_assigns_identifier() {
    let (service, _) = build_service();
    let contact = service.register_contact(contact()).expect("contact stored");
    assert!(contact.id.0.starts_with("contact-"));
    assert_eq!(contact.details.full_name, "Ada Lovelace");
}
