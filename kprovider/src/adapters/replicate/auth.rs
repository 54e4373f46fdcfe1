use std::fmt::{Debug, Formatter};

use crate::ProviderError;

/// Bearer token for the prediction API. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ReplicateAuth {
    token: String,
}

impl ReplicateAuth {
    pub fn new(token: impl Into<String>) -> Result<Self, ProviderError> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(ProviderError::authentication(
                "replicate api token must not be empty",
            ));
        }
        Ok(Self { token })
    }

    pub fn expose(&self) -> &str {
        self.token.as_str()
    }
}

impl Debug for ReplicateAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("ReplicateAuth([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderErrorKind;

    #[test]
    fn blank_token_is_rejected_and_debug_is_redacted() {
        let err = ReplicateAuth::new("   ").expect_err("blank token must fail");
        assert_eq!(err.kind, ProviderErrorKind::Authentication);

        let auth = ReplicateAuth::new(" r8_secret ").expect("token should be accepted");
        assert_eq!(auth.expose(), "r8_secret");
        assert_eq!(format!("{auth:?}"), "ReplicateAuth([REDACTED])");
    }
}
