//! TLS mode resolution for the ManifestWork backend: mutual TLS, then
//! bearer-token-plus-CA, then CA-only, then plaintext, in that priority order.
//! `insecure=false` with no TLS material configured at all is a fatal
//! initialization error; the transport refuses to silently fall back to
//! plaintext.

use hyperfleet_adapter_core::TransportError;

const BACKEND: &str = "manifestwork";

#[derive(Debug, Clone, Default)]
pub struct TlsMaterial {
    pub ca_cert_pem: Option<Vec<u8>>,
    pub client_cert_pem: Option<Vec<u8>>,
    pub client_key_pem: Option<Vec<u8>>,
    pub bearer_token: Option<String>,
    pub insecure: bool,
}

#[derive(Debug, Clone)]
pub enum TlsMode {
    Mutual { ca: Vec<u8>, cert: Vec<u8>, key: Vec<u8> },
    Bearer { token: String, ca: Vec<u8> },
    CaOnly { ca: Vec<u8> },
    Insecure,
}

impl TlsMode {
    pub fn resolve(material: &TlsMaterial) -> Result<Self, TransportError> {
        if let (Some(ca), Some(cert), Some(key)) =
            (&material.ca_cert_pem, &material.client_cert_pem, &material.client_key_pem)
        {
            return Ok(TlsMode::Mutual { ca: ca.clone(), cert: cert.clone(), key: key.clone() });
        }
        if let (Some(token), Some(ca)) = (&material.bearer_token, &material.ca_cert_pem) {
            return Ok(TlsMode::Bearer { token: token.clone(), ca: ca.clone() });
        }
        if let Some(ca) = &material.ca_cert_pem {
            return Ok(TlsMode::CaOnly { ca: ca.clone() });
        }
        if material.insecure {
            return Ok(TlsMode::Insecure);
        }
        Err(TransportError::Configuration {
            backend: BACKEND.to_string(),
            message: "no TLS material configured and insecure=false; refusing to fall back to plaintext".to_string(),
        })
    }

    pub fn bearer_token(&self) -> Option<&str> {
        match self {
            TlsMode::Bearer { token, .. } => Some(token),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_mutual_tls_when_all_material_present() {
        let material = TlsMaterial {
            ca_cert_pem: Some(vec![1]),
            client_cert_pem: Some(vec![2]),
            client_key_pem: Some(vec![3]),
            bearer_token: Some("tok".to_string()),
            insecure: false,
        };
        assert!(matches!(TlsMode::resolve(&material).unwrap(), TlsMode::Mutual { .. }));
    }

    #[test]
    fn falls_back_to_bearer_plus_ca_without_client_cert() {
        let material = TlsMaterial {
            ca_cert_pem: Some(vec![1]),
            bearer_token: Some("tok".to_string()),
            ..Default::default()
        };
        assert!(matches!(TlsMode::resolve(&material).unwrap(), TlsMode::Bearer { .. }));
    }

    #[test]
    fn falls_back_to_ca_only_without_bearer_token() {
        let material = TlsMaterial { ca_cert_pem: Some(vec![1]), ..Default::default() };
        assert!(matches!(TlsMode::resolve(&material).unwrap(), TlsMode::CaOnly { .. }));
    }

    #[test]
    fn falls_back_to_insecure_only_when_explicitly_set() {
        let material = TlsMaterial { insecure: true, ..Default::default() };
        assert!(matches!(TlsMode::resolve(&material).unwrap(), TlsMode::Insecure));
    }

    #[test]
    fn missing_tls_material_with_insecure_false_is_fatal() {
        let material = TlsMaterial::default();
        assert!(TlsMode::resolve(&material).is_err());
    }
}
