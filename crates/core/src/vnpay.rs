//! VNPAY payment gateway signing (API version 2.1.0).
//!
//! Payment requests are redirects to the gateway with every `vnp_*`
//! parameter in the query string plus `vnp_SecureHash`, the HMAC-SHA512 of
//! the key-sorted, form-urlencoded parameters. The gateway calls back with
//! the same scheme, which [`verify_callback`] checks.

use std::collections::BTreeMap;

use chrono::FixedOffset;
use hmac::{Hmac, Mac};
use sha2::Sha512;
use url::form_urlencoded;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

pub const VNP_VERSION: &str = "2.1.0";
pub const VNP_COMMAND_PAY: &str = "pay";
pub const VNP_CURRENCY: &str = "VND";
pub const VNP_LOCALE: &str = "vn";
pub const VNP_ORDER_TYPE: &str = "other";

/// Response/transaction code meaning success.
pub const VNP_SUCCESS_CODE: &str = "00";

const SECURE_HASH: &str = "vnp_SecureHash";
const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

/// Gateway timestamps are Vietnam local time (GMT+7).
const VN_OFFSET_SECS: i32 = 7 * 3600;

/// Minutes a payment URL stays valid at the gateway.
pub const PAYMENT_EXPIRY_MINUTES: i64 = 15;

type HmacSha512 = Hmac<Sha512>;

/// Merchant credentials and endpoints.
#[derive(Debug, Clone)]
pub struct VnpayMerchant {
    pub tmn_code: String,
    pub hash_secret: String,
    pub pay_url: String,
    pub return_url: String,
}

/// Input for a payment redirect.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub txn_ref: String,
    /// Amount in VND (the gateway receives it multiplied by 100).
    pub amount: i64,
    pub order_info: String,
    pub ip_addr: String,
    pub created_at: Timestamp,
}

/// Parsed, signature-checked gateway callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResult {
    pub txn_ref: String,
    /// Amount in VND.
    pub amount: i64,
    pub response_code: String,
    pub transaction_no: Option<String>,
    pub bank_code: Option<String>,
}

impl CallbackResult {
    pub fn is_success(&self) -> bool {
        self.response_code == VNP_SUCCESS_CODE
    }
}

/// Hex HMAC-SHA512 of `data` under `secret`.
pub fn sign(secret: &str, data: &str) -> String {
    let mut mac =
        HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(data.as_bytes());
    mac.finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Form-urlencode `params` in key order, skipping empty values.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        if !value.is_empty() {
            serializer.append_pair(key, value);
        }
    }
    serializer.finish()
}

fn gateway_time(at: Timestamp) -> String {
    let offset = FixedOffset::east_opt(VN_OFFSET_SECS).expect("GMT+7 is a valid offset");
    at.with_timezone(&offset).format("%Y%m%d%H%M%S").to_string()
}

/// Transaction reference for a payment batch: the batch id followed by the
/// attempt timestamp, so retried payments get distinct references.
pub fn txn_ref_for(batch_id: DbId, at: Timestamp) -> String {
    format!("{}{}", batch_id.simple(), at.timestamp())
}

/// Recover the batch id from a reference built by [`txn_ref_for`].
pub fn batch_id_from_txn_ref(txn_ref: &str) -> Result<DbId, CoreError> {
    txn_ref
        .get(..32)
        .and_then(|hex| DbId::try_parse(hex).ok())
        .ok_or_else(|| CoreError::Validation(format!("Unknown transaction reference '{txn_ref}'")))
}

/// Build the signed redirect URL for `request`.
///
/// The gateway takes amounts in minor units (x100).
pub fn build_payment_url(
    merchant: &VnpayMerchant,
    request: &PaymentRequest,
) -> Result<String, CoreError> {
    let minor_amount = request.amount.checked_mul(100).ok_or_else(|| {
        CoreError::Validation(format!("Payment amount {} is too large", request.amount))
    })?;
    let expire_at = request.created_at + chrono::Duration::minutes(PAYMENT_EXPIRY_MINUTES);

    let params: BTreeMap<String, String> = [
        ("vnp_Version", VNP_VERSION.to_string()),
        ("vnp_Command", VNP_COMMAND_PAY.to_string()),
        ("vnp_TmnCode", merchant.tmn_code.clone()),
        ("vnp_Amount", minor_amount.to_string()),
        ("vnp_CurrCode", VNP_CURRENCY.to_string()),
        ("vnp_TxnRef", request.txn_ref.clone()),
        ("vnp_OrderInfo", request.order_info.clone()),
        ("vnp_OrderType", VNP_ORDER_TYPE.to_string()),
        ("vnp_Locale", VNP_LOCALE.to_string()),
        ("vnp_ReturnUrl", merchant.return_url.clone()),
        ("vnp_IpAddr", request.ip_addr.clone()),
        ("vnp_CreateDate", gateway_time(request.created_at)),
        ("vnp_ExpireDate", gateway_time(expire_at)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect();

    let query = canonical_query(&params);
    let hash = sign(&merchant.hash_secret, &query);
    Ok(format!("{}?{query}&{SECURE_HASH}={hash}", merchant.pay_url))
}

/// Check the signature of a gateway callback and extract its result.
pub fn verify_callback(
    hash_secret: &str,
    params: &BTreeMap<String, String>,
) -> Result<CallbackResult, CoreError> {
    let provided = params
        .get(SECURE_HASH)
        .ok_or_else(|| CoreError::Validation("Missing vnp_SecureHash".into()))?;

    let signed: BTreeMap<String, String> = params
        .iter()
        .filter(|(k, _)| k.starts_with("vnp_") && *k != SECURE_HASH && *k != SECURE_HASH_TYPE)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let expected = sign(hash_secret, &canonical_query(&signed));
    if !expected.eq_ignore_ascii_case(provided) {
        return Err(CoreError::Forbidden("Invalid VNPAY signature".into()));
    }

    let field = |name: &str| -> Result<String, CoreError> {
        params
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::Validation(format!("Missing {name}")))
    };

    let raw_amount: i64 = field("vnp_Amount")?
        .parse()
        .map_err(|_| CoreError::Validation("vnp_Amount is not a number".into()))?;

    // A transaction status, when present, must agree with the response code.
    let mut response_code = field("vnp_ResponseCode")?;
    if let Some(status) = params.get("vnp_TransactionStatus") {
        if status != VNP_SUCCESS_CODE && response_code == VNP_SUCCESS_CODE {
            response_code = status.clone();
        }
    }

    Ok(CallbackResult {
        txn_ref: field("vnp_TxnRef")?,
        amount: raw_amount / 100,
        response_code,
        transaction_no: params.get("vnp_TransactionNo").cloned(),
        bank_code: params.get("vnp_BankCode").cloned(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    use super::*;

    fn merchant() -> VnpayMerchant {
        VnpayMerchant {
            tmn_code: "KOIPOND1".into(),
            hash_secret: "sandbox-secret".into(),
            pay_url: "https://sandbox.vnpayment.vn/paymentv2/vpcpay.html".into(),
            return_url: "https://koi.example/payments/return".into(),
        }
    }

    fn query_params(url: &str) -> BTreeMap<String, String> {
        let query = url.split_once('?').map(|(_, q)| q).unwrap_or_default();
        form_urlencoded::parse(query.as_bytes()).into_owned().collect()
    }

    #[test]
    fn sign_is_hex_sha512_length() {
        let sig = sign("secret", "a=1&b=2");
        assert_eq!(sig.len(), 128);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(sig, sign("other", "a=1&b=2"));
    }

    #[test]
    fn canonical_query_sorts_and_encodes() {
        let mut params = BTreeMap::new();
        params.insert("vnp_OrderInfo".to_string(), "Pay deposit #1".to_string());
        params.insert("vnp_Amount".to_string(), "1000".to_string());
        params.insert("vnp_BankCode".to_string(), String::new());
        assert_eq!(
            canonical_query(&params),
            "vnp_Amount=1000&vnp_OrderInfo=Pay+deposit+%231"
        );
    }

    #[test]
    fn payment_url_is_signed_and_round_trips_through_verification() {
        let created_at = Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap();
        let request = PaymentRequest {
            txn_ref: txn_ref_for(Uuid::new_v4(), created_at),
            amount: 2_500_000,
            order_info: "Deposit for contract".into(),
            ip_addr: "127.0.0.1".into(),
            created_at,
        };
        let url = build_payment_url(&merchant(), &request).unwrap();
        let mut params = query_params(&url);

        assert_eq!(params["vnp_Amount"], "250000000");
        assert_eq!(params["vnp_CreateDate"], "20240501100000");
        assert_eq!(params["vnp_ExpireDate"], "20240501101500");

        // Simulate the gateway echoing the request back with a result.
        params.insert("vnp_ResponseCode".into(), "00".into());
        params.insert("vnp_TransactionNo".into(), "14000001".into());
        let signed: BTreeMap<String, String> = params
            .iter()
            .filter(|(k, _)| k.as_str() != "vnp_SecureHash")
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        params.insert("vnp_SecureHash".into(), sign("sandbox-secret", &canonical_query(&signed)));

        let result = verify_callback("sandbox-secret", &params).unwrap();
        assert!(result.is_success());
        assert_eq!(result.amount, 2_500_000);
        assert_eq!(result.txn_ref, request.txn_ref);
        assert_eq!(result.transaction_no.as_deref(), Some("14000001"));
    }

    #[test]
    fn oversized_amount_is_rejected_before_signing() {
        let request = PaymentRequest {
            txn_ref: "ref".into(),
            amount: i64::MAX / 10,
            order_info: "Deposit".into(),
            ip_addr: "127.0.0.1".into(),
            created_at: Utc::now(),
        };
        let err = build_payment_url(&merchant(), &request).unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn tampered_callback_rejected() {
        let mut params = BTreeMap::new();
        params.insert("vnp_Amount".to_string(), "100000".to_string());
        params.insert("vnp_ResponseCode".to_string(), "00".to_string());
        params.insert("vnp_TxnRef".to_string(), "abc".to_string());
        let sig = sign("sandbox-secret", &canonical_query(&params));
        params.insert("vnp_SecureHash".to_string(), sig);
        params.insert("vnp_Amount".to_string(), "999999900".to_string());

        let err = verify_callback("sandbox-secret", &params).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[test]
    fn failed_transaction_status_overrides_response_code() {
        let mut params = BTreeMap::new();
        params.insert("vnp_Amount".to_string(), "100000".to_string());
        params.insert("vnp_ResponseCode".to_string(), "00".to_string());
        params.insert("vnp_TransactionStatus".to_string(), "02".to_string());
        params.insert("vnp_TxnRef".to_string(), "abc".to_string());
        let sig = sign("s", &canonical_query(&params));
        params.insert("vnp_SecureHash".to_string(), sig);

        let result = verify_callback("s", &params).unwrap();
        assert!(!result.is_success());
        assert_eq!(result.response_code, "02");
    }

    #[test]
    fn txn_ref_encodes_batch_id() {
        let id = Uuid::new_v4();
        let txn_ref = txn_ref_for(id, Utc::now());
        assert_eq!(batch_id_from_txn_ref(&txn_ref).unwrap(), id);
        assert!(batch_id_from_txn_ref("short").is_err());
    }
}
