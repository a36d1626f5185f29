use koi_core::deferred::DEFAULT_MAX_ATTEMPTS;
use koi_core::otp::DEFAULT_OTP_TTL_SECS;
use koi_core::vnpay::VnpayMerchant;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    pub jwt: JwtConfig,
    /// Lifetime of contract/document confirmation codes (default: `300`).
    pub otp_ttl_secs: i64,
    pub jobs: JobConfig,
    /// VNPAY merchant settings; `None` disables online payment.
    pub vnpay: Option<VnpayMerchant>,
}

/// Deferred job runner settings.
#[derive(Debug, Clone)]
pub struct JobConfig {
    /// Queue poll interval in milliseconds (default: `1000`).
    pub poll_interval_ms: u64,
    /// Attempts before a failing job is marked FAILED (default: `3`).
    pub max_attempts: i32,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `OTP_TTL_SECS`         | `300`                      |
    /// | `JOB_POLL_INTERVAL_MS` | `1000`                     |
    /// | `JOB_MAX_ATTEMPTS`     | `3`                        |
    ///
    /// JWT settings come from [`JwtConfig::from_env`] and VNPAY settings
    /// from [`vnpay_from_env`].
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let otp_ttl_secs: i64 = std::env::var("OTP_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_OTP_TTL_SECS.to_string())
            .parse()
            .expect("OTP_TTL_SECS must be a valid i64");
        assert!(otp_ttl_secs > 0, "OTP_TTL_SECS must be positive");

        let defaults = JobConfig::default();
        let jobs = JobConfig {
            poll_interval_ms: std::env::var("JOB_POLL_INTERVAL_MS")
                .ok()
                .map(|v| v.parse().expect("JOB_POLL_INTERVAL_MS must be a valid u64"))
                .unwrap_or(defaults.poll_interval_ms),
            max_attempts: std::env::var("JOB_MAX_ATTEMPTS")
                .ok()
                .map(|v| v.parse().expect("JOB_MAX_ATTEMPTS must be a valid i32"))
                .unwrap_or(defaults.max_attempts),
        };

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            jwt: JwtConfig::from_env(),
            otp_ttl_secs,
            jobs,
            vnpay: vnpay_from_env(),
        }
    }

    pub fn otp_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.otp_ttl_secs)
    }
}

/// Load VNPAY merchant settings.
///
/// Returns `None` unless both `VNPAY_TMN_CODE` and `VNPAY_HASH_SECRET` are set.
///
/// | Env Var             | Required | Default                                               |
/// |---------------------|----------|-------------------------------------------------------|
/// | `VNPAY_TMN_CODE`    | yes      |                                                       |
/// | `VNPAY_HASH_SECRET` | yes      |                                                       |
/// | `VNPAY_PAY_URL`     | no       | `https://sandbox.vnpayment.vn/paymentv2/vpcpay.html`  |
/// | `VNPAY_RETURN_URL`  | no       | `http://localhost:5173/payments/result`               |
pub fn vnpay_from_env() -> Option<VnpayMerchant> {
    let tmn_code = std::env::var("VNPAY_TMN_CODE").ok()?;
    let hash_secret = std::env::var("VNPAY_HASH_SECRET").ok()?;
    Some(VnpayMerchant {
        tmn_code,
        hash_secret,
        pay_url: std::env::var("VNPAY_PAY_URL")
            .unwrap_or_else(|_| "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into()),
        return_url: std::env::var("VNPAY_RETURN_URL")
            .unwrap_or_else(|_| "http://localhost:5173/payments/result".into()),
    })
}
