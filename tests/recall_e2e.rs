mod common;

use common::{date, test_app, USER};
use landbook::application::errors::ServiceError;
use landbook::application::services::catalog::{BuyerInput, PropertyInput};
use landbook::application::services::documents::Upload;
use landbook::application::services::payments::PaymentInput;
use landbook::application::services::sales::HoldInput;
use landbook::domain::entities::document_owner::DocumentOwner;
use landbook::domain::entities::lot::LotStatus;
use landbook::domain::repositories::blob_store::{BlobStore, StorageError};
use landbook::persistence::models::LotDetails;

fn upload(name: &str) -> Upload {
    Upload {
        name: name.to_string(),
        content_type: Some("application/pdf".to_string()),
        bytes: b"%PDF-1.4 survey".to_vec(),
    }
}

#[tokio::test]
async fn test_hold_then_recall_clears_the_lot() {
    let app = test_app(date(2024, 6, 1)).await;
    let state = &app.state;

    let property = state
        .catalog
        .create_property(
            USER,
            PropertyInput {
                title: Some("Hill Farm".to_string()),
                description: Some("North parcel".to_string()),
            },
        )
        .await
        .unwrap();
    let lot = state
        .catalog
        .create_subdivision(
            USER,
            &property.id,
            LotDetails {
                title: Some("Lot 2".to_string()),
                sale_price: Some(8_000.0),
                ..LotDetails::default()
            },
        )
        .await
        .unwrap();
    let buyer = state
        .catalog
        .create_buyer(
            USER,
            BuyerInput {
                name: Some("Kwame Mensah".to_string()),
                phone: Some("+233 20 000 0000".to_string()),
                ..BuyerInput::default()
            },
        )
        .await
        .unwrap();

    let hold = state
        .sales
        .place_hold(
            USER,
            &lot.id,
            HoldInput {
                buyer_id: buyer.id.clone(),
                hold_amount: 500.0,
                hold_until_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(hold.subdivision.status, LotStatus::OnHold);
    assert_eq!(hold.subdivision.hold_until_date, Some(date(2024, 7, 1)));
    let deposit = hold.payment.unwrap();
    assert_eq!(deposit.principal_amount, None);
    assert_eq!(deposit.notes.as_deref(), Some("Hold deposit - Hold until 2024-07-01"));

    let installment = state
        .payments
        .record_lot_payment(
            USER,
            &lot.id,
            PaymentInput {
                amount: 250.0,
                send_receipt_to: Some("kwame@example.com".to_string()),
                ..PaymentInput::default()
            },
        )
        .await
        .unwrap();
    assert!(installment.receipt.is_some());
    assert_eq!(installment.remaining_balance, 7_250.0);

    let lot_doc = state
        .documents
        .upload(USER, DocumentOwner::Subdivision(lot.id.clone()), upload("survey.pdf"))
        .await
        .unwrap();
    let payment_doc = state
        .documents
        .upload(USER, DocumentOwner::Payment(deposit.id.clone()), upload("slip.pdf"))
        .await
        .unwrap();
    let property_doc = state
        .documents
        .upload(USER, DocumentOwner::Property(property.id.clone()), upload("deed.pdf"))
        .await
        .unwrap();

    // A recall needs a reason.
    let err = state.recall.recall(USER, &lot.id, Some("  ")).await.unwrap_err();
    assert!(matches!(err, ServiceError::Validation(_)));

    let report = state
        .recall
        .recall(USER, &lot.id, Some("Buyer stopped paying"))
        .await
        .unwrap();
    assert!(report.failed_steps.is_empty());
    assert_eq!(report.payments_removed, 2);
    assert_eq!(report.receipts_removed, 1);
    assert_eq!(report.receipt_emails_removed, 1);
    assert_eq!(report.documents_removed, 2);

    let history = report.history.unwrap();
    assert_eq!(history.recall_reason, "Buyer stopped paying");
    assert_eq!(history.total_paid, 750.0);
    assert_eq!(history.hold_amount, Some(500.0));
    assert_eq!(history.buyer_name.as_deref(), Some("Kwame Mensah"));
    assert_eq!(history.sale_price, Some(8_000.0));

    let cleared = report.subdivision;
    assert_eq!(cleared.status, LotStatus::Available);
    assert_eq!(cleared.buyer_id, None);
    assert_eq!(cleared.sale_price, 0.0);
    assert_eq!(cleared.hold_until_date, None);
    assert_eq!(cleared.last_payment_date, None);

    let ledger = state.payments.lot_ledger(USER, &lot.id).await.unwrap();
    assert!(ledger.payments.is_empty());

    assert!(matches!(
        app.blobs.get(&lot_doc.file_path).await,
        Err(StorageError::NotFound(_))
    ));
    assert!(matches!(
        app.blobs.get(&payment_doc.file_path).await,
        Err(StorageError::NotFound(_))
    ));
    // Documents on the property are untouched.
    assert!(app.blobs.get(&property_doc.file_path).await.is_ok());
    let remaining = state.documents.list(USER, None).await.unwrap();
    assert_eq!(remaining.len(), 1);

    let past = state.recall.history(USER, &lot.id).await.unwrap();
    assert_eq!(past.len(), 1);
}

#[tokio::test]
async fn test_document_lifecycle() {
    let app = test_app(date(2024, 6, 1)).await;
    let state = &app.state;

    let property = state
        .catalog
        .create_property(
            USER,
            PropertyInput {
                title: Some("Lakeside".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();
    let owner = DocumentOwner::Property(property.id.clone());

    let document = state
        .documents
        .upload(USER, owner.clone(), upload("Site Plan.PDF"))
        .await
        .unwrap();
    assert!(document.file_path.starts_with("user-1/"));
    assert!(document.file_path.ends_with(".pdf"));
    assert_eq!(state.documents.count(USER, &owner).await.unwrap(), 1);

    let replaced = state
        .documents
        .replace(USER, &document.id, upload("site-plan-v2.pdf"))
        .await
        .unwrap();
    assert_ne!(replaced.file_path, document.file_path);
    assert_eq!(replaced.name, "site-plan-v2.pdf");
    assert!(app.blobs.get(&document.file_path).await.is_err());

    let link = state.documents.signed_link(USER, &document.id).await.unwrap();
    assert!(link.url.contains("signature="));
    assert_eq!(link.expires_in, 3600);

    let empty = Upload {
        bytes: Vec::new(),
        ..upload("empty.pdf")
    };
    assert!(state.documents.upload(USER, owner.clone(), empty).await.is_err());

    state.documents.delete(USER, &document.id).await.unwrap();
    assert_eq!(state.documents.count(USER, &owner).await.unwrap(), 0);
    assert!(app.blobs.get(&replaced.file_path).await.is_err());
}

#[tokio::test]
async fn test_documents_only_attach_to_own_records() {
    let app = test_app(date(2024, 6, 1)).await;
    let state = &app.state;

    let property = state
        .catalog
        .create_property(
            USER,
            PropertyInput {
                title: Some("Ridge View".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();

    let err = state
        .documents
        .upload(
            "user-2",
            DocumentOwner::Property(property.id.clone()),
            upload("deed.pdf"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "property", .. }));

    let err = state
        .documents
        .upload("user-2", DocumentOwner::Subdivision("missing".to_string()), upload("plan.pdf"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { .. }));

    // Nothing was written for either attempt.
    assert!(state.documents.list("user-2", None).await.unwrap().is_empty());
    assert!(state.documents.list(USER, None).await.unwrap().is_empty());
    let stored = std::fs::read_dir(&app.storage_root).unwrap().count();
    assert_eq!(stored, 0);
}

#[tokio::test]
async fn test_upload_for_email_style_user_id() {
    let app = test_app(date(2024, 6, 1)).await;
    let state = &app.state;
    let user = "ama@example.com";

    let property = state
        .catalog
        .create_property(
            user,
            PropertyInput {
                title: Some("Coastal Plot".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();
    let document = state
        .documents
        .upload(user, DocumentOwner::Property(property.id.clone()), upload("deed.pdf"))
        .await
        .unwrap();
    assert!(!document.file_path.contains('@'));
    assert!(app.blobs.get(&document.file_path).await.is_ok());

    let link = state.documents.signed_link(user, &document.id).await.unwrap();
    assert!(link.url.contains(&document.file_path));
}

#[tokio::test]
async fn test_recall_of_unpriced_hold_keeps_no_price() {
    let app = test_app(date(2024, 6, 1)).await;
    let state = &app.state;

    let property = state
        .catalog
        .create_property(
            USER,
            PropertyInput {
                title: Some("Valley Farm".to_string()),
                description: None,
            },
        )
        .await
        .unwrap();
    let lot = state
        .catalog
        .create_subdivision(
            USER,
            &property.id,
            LotDetails {
                title: Some("Lot 9".to_string()),
                ..LotDetails::default()
            },
        )
        .await
        .unwrap();
    let buyer = state
        .catalog
        .create_buyer(
            USER,
            BuyerInput {
                name: Some("Yaw Asante".to_string()),
                ..BuyerInput::default()
            },
        )
        .await
        .unwrap();
    state
        .sales
        .place_hold(
            USER,
            &lot.id,
            HoldInput {
                buyer_id: buyer.id.clone(),
                hold_amount: 100.0,
                hold_until_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();

    let report = state
        .recall
        .recall(USER, &lot.id, Some("Hold lapsed"))
        .await
        .unwrap();
    let history = report.history.unwrap();
    assert_eq!(history.sale_price, None);
    assert_eq!(history.total_paid, 100.0);
}
