//! Endpoint collection: authenticated fetch, Kerberos session, bean decoding
//!
//! # Example
//!
//! ```ignore
//! use hadoop_exporter::collector::{decode, AuthMode, Fetcher};
//!
//! let fetcher = Fetcher::new(5000)?;
//! let body = fetcher.fetch("http://nn01:50070/jmx", &AuthMode::Anonymous).await?;
//! let beans = decode(&body)?;
//! ```

mod decoder;
mod fetcher;
mod krb;

pub use decoder::{decode, Bean, FieldValue};
pub use fetcher::{service_principal, AuthMode, Fetcher};
pub use krb::{private_ccache_path, KrbSession, Principal, RealmConfig, KRB5_CONF_PATH};
