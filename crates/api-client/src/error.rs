#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not encode request: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The API answered with `success:false`.
    #[error("{action_type} failed with status {status}: {message}")]
    Api {
        action_type: &'static str,
        status: u16,
        message: String,
    },

    #[error("{0} requires an access token")]
    NotAuthenticated(&'static str),
}
