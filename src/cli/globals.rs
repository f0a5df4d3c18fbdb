use secrecy::SecretString;

/// Process-wide configuration shared with the server: the public base URL of
/// the frontend (reset links, CORS origin, cookie `Secure` flag) and the
/// immutable JWT signing secret, read-only at request time.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub base_url: String,
    pub jwt_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            jwt_secret: SecretString::default(),
        }
    }

    pub fn set_jwt_secret(&mut self, secret: SecretString) {
        self.jwt_secret = secret;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_global_args() {
        let base_url = "https://trips.example.com".to_string();
        let args = GlobalArgs::new(base_url);
        assert_eq!(args.base_url, "https://trips.example.com");
        assert_eq!(args.jwt_secret.expose_secret(), "");
    }

    #[test]
    fn test_set_jwt_secret() {
        let mut args = GlobalArgs::new("http://localhost:5173".to_string());
        args.set_jwt_secret(SecretString::from("s3cret"));
        assert_eq!(args.jwt_secret.expose_secret(), "s3cret");
    }
}
