pub mod hmac;

pub use self::hmac::{ApiCredentials, HmacAuth, API_KEY_HEADER};
