use crate::base::neterror::NetError;
use crate::socket::client::SocketType;
use crate::socket::tls::TlsConfig;
use crate::urlrequest::requestspec::Scheme;
use boring::ssl::{SslConnector, SslMethod};
use tokio::net::TcpStream;
use url::Url;

/// Where a physical request connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Hostname as written in the URL (IPv6 literals keep their brackets).
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    /// Split `host[:port]`, falling back to the scheme's default port.
    pub fn parse(scheme: Scheme, host: &str) -> Result<Self, NetError> {
        let url = Url::parse(&format!("{}://{}/", scheme.as_str(), host))
            .map_err(|_| NetError::InvalidUrl)?;
        let hostname = url.host_str().ok_or(NetError::InvalidUrl)?;
        let port = url.port().unwrap_or_else(|| scheme.default_port());
        Ok(Self {
            host: hostname.to_string(),
            port,
        })
    }

    /// Hostname without IPv6 brackets, for TLS verification.
    pub fn domain(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }
}

/// Manages the connection process: DNS -> TCP -> SSL.
pub struct ConnectJob;

impl ConnectJob {
    pub async fn connect(
        scheme: Scheme,
        host: &str,
        tls: &TlsConfig,
    ) -> Result<SocketType, NetError> {
        let endpoint = Endpoint::parse(scheme, host)?;

        // 1. DNS Resolution
        let addr_str = format!("{}:{}", endpoint.host, endpoint.port);
        let addrs: Vec<_> = tokio::net::lookup_host(&addr_str)
            .await
            .map_err(|e| NetError::dns_failed(endpoint.host.as_str(), e))?
            .collect();

        // 2. TCP Connect, first address that answers wins
        let mut last_err = None;
        let mut stream = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(s) => {
                    stream = Some(s);
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }

        let stream = match (stream, last_err) {
            (Some(s), _) => s,
            (None, Some(e)) => {
                return Err(NetError::connection_failed_to(
                    endpoint.host.as_str(),
                    endpoint.port,
                    e,
                ));
            }
            (None, None) => return Err(NetError::NameNotResolved),
        };
        let _ = stream.set_nodelay(true);

        // 3. SSL Handshake (if https)
        match scheme {
            Scheme::Http => Ok(SocketType::Tcp(stream)),
            Scheme::Https => {
                let mut builder = SslConnector::builder(SslMethod::tls())
                    .map_err(|_| NetError::SslProtocolError)?;
                tls.apply_to_builder(&mut builder)?;

                let connector = builder.build();
                let mut config = connector
                    .configure()
                    .map_err(|_| NetError::SslProtocolError)?;
                if !TlsConfig::should_set_sni(endpoint.domain()) {
                    config.set_use_server_name_indication(false);
                }
                if tls.danger_accept_invalid_certs {
                    config.set_verify_hostname(false);
                }

                let tls_stream = tokio_boring::connect(config, endpoint.domain(), stream)
                    .await
                    .map_err(|e| {
                        tracing::debug!(host = %endpoint.host, error = ?e, "TLS handshake failed");
                        NetError::SslProtocolError
                    })?;

                Ok(SocketType::Ssl(tls_stream))
            }
        }
    }
}
