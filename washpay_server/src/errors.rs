use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use thiserror::Error;
use washpay_engine::{traits::PaymentGatewayError, OrderFlowError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Payload deserialization error")]
    CouldNotDeserializePayload,
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Could not read request path: {0}")]
    InvalidRequestPath(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("{0}")]
    OrderFlow(#[from] OrderFlowError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::CouldNotDeserializePayload => StatusCode::BAD_REQUEST,
            Self::InvalidRequestPath(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::OrderFlow(e) => order_flow_status(e),
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

fn order_flow_status(e: &OrderFlowError) -> StatusCode {
    match e {
        OrderFlowError::LaundromatNotFound(_) => StatusCode::NOT_FOUND,
        OrderFlowError::PayoutAccountMissing(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OrderFlowError::Promo(_) => StatusCode::UNPROCESSABLE_ENTITY,
        // the order was taken but the provider would not play along
        OrderFlowError::PaymentInitiationFailed(_) => StatusCode::BAD_GATEWAY,
        OrderFlowError::Database(e) => match e {
            PaymentGatewayError::OrderNotFound(_) | PaymentGatewayError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
            PaymentGatewayError::LaundromatNotFound(_) => StatusCode::NOT_FOUND,
            PaymentGatewayError::OrderModificationNoOp => StatusCode::BAD_REQUEST,
            PaymentGatewayError::OrderModificationForbidden => StatusCode::CONFLICT,
            PaymentGatewayError::PromoError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}
