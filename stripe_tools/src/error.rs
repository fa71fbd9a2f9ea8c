use thiserror::Error;

#[derive(Debug, Error)]
pub enum StripeApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid REST response: {0}")]
    RestResponseError(String),
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
    #[error("Request failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The provider did not return a client secret for intent {0}")]
    MissingClientSecret(String),
}
