use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fieldstock API",
        version = "0.3.0",
        description = r#"
# Fieldstock Inventory Transfer & Reconciliation API

Distributes finite product stock from a company's central inventory to
field sellers and keeps every unit accounted for.

## Features

- **Transfers**: company-to-seller stock movements with seller acceptance
- **Kits**: daily stock batches with frozen per-item prices for commission math
- **Devolutions**: seller-initiated returns confirmed by the company
- **Movement Log**: append-only audit trail of every balance change
- **Sales Quotas**: monthly ceilings for free solo accounts

## Authentication

All `/api/v1` endpoints require a bearer token:

```
Authorization: Bearer <your-jwt-token>
```

## Error Handling

Errors use a consistent envelope with stable HTTP status codes; stock
shortages are itemized per product in `details`.
"#,
        contact(name = "Fieldstock Team", email = "dev@fieldstock.app"),
        license(name = "MIT")
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        crate::errors::StockShortage,
        crate::commands::transfers::StockItemInput,
        crate::handlers::transfers::CreateTransferRequest,
        crate::handlers::transfers::TransferSummary,
        crate::handlers::kits::CreateKitRequest,
        crate::handlers::kits::KitSummary,
        crate::handlers::returns::CreateReturnRequest,
        crate::handlers::returns::ReturnSummary,
        crate::handlers::inventory::ReceiveStockRequest,
        crate::handlers::inventory::BalanceView,
        crate::handlers::inventory::MovementView,
        crate::handlers::quota::RecordSaleRequest,
        crate::services::quota::QuotaStatus,
    )),
    tags(
        (name = "transfers", description = "Company-to-seller stock transfers"),
        (name = "kits", description = "Daily kit assignments"),
        (name = "returns", description = "Seller devolutions"),
        (name = "inventory", description = "Balances, receipts and the movement log"),
        (name = "quota", description = "Monthly sales quotas for solo accounts"),
    )
)]
pub struct ApiDoc;

/// Swagger UI mounted at `/docs`, serving the document at
/// `/api-docs/openapi.json`.
pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
