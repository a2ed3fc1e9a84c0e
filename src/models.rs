// src/models.rs
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Raw `GET /wallet` body: `{ "balance": { "amount": .. }, "currency": .. }`
#[derive(Debug, Clone, Deserialize)]
pub struct WalletInfoDto {
    pub balance: BalanceDto,
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BalanceDto {
    pub amount: Decimal,
}

/// Server-asserted balance at the time of the last fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletSnapshot {
    pub balance_amount: Decimal,
    pub currency_code: String,
}

impl From<WalletInfoDto> for WalletSnapshot {
    fn from(dto: WalletInfoDto) -> Self {
        Self {
            balance_amount: dto.balance.amount,
            currency_code: dto.currency,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub service_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferKind {
    #[serde(rename = "IN")]
    Incoming,
    #[serde(rename = "OUT")]
    Outgoing,
    #[serde(rename = "EXTERNAL_LOAD")]
    ExternalLoad,
}

/// One history entry. Never edited client-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: String,
    pub from_participant: Participant,
    pub to_participant: Participant,
    pub timestamp: String, // kept verbatim, see occurred_at()
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransferKind,
}

impl TransferRecord {
    /// The other side of the transfer from the wallet holder's point of view.
    pub fn counterparty(&self) -> &Participant {
        match self.kind {
            TransferKind::Outgoing => &self.to_participant,
            TransferKind::Incoming | TransferKind::ExternalLoad => &self.from_participant,
        }
    }

    /// RFC 3339, or an offset-less ISO 8601 date-time read as UTC.
    pub fn occurred_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

/// Pagination envelope for `GET /transfer`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferHistoryPage {
    pub content: Vec<TransferRecord>,
    pub total_elements: u64,
    pub total_pages: u32,
    pub number: u32,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferSubmission {
    pub to_email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebinSubmission {
    pub external_service_name: String,
    pub service_type: String,
    pub external_email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// Accepts both `{ "token": .. }` and `{ "success", "message", "user": { .. } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<AuthUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl AuthResponse {
    pub fn session_token(&self) -> Option<&str> {
        self.token
            .as_deref()
            .or_else(|| self.user.as_ref().and_then(|u| u.token.as_deref()))
            .filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(kind: &str, timestamp: &str) -> TransferRecord {
        serde_json::from_value(json!({
            "id": "t-1",
            "fromParticipant": { "serviceType": "WALLET", "serviceName": "bags", "email": "ann@example.com" },
            "toParticipant": { "serviceType": "WALLET", "serviceName": "bags", "email": "bob@example.com" },
            "timestamp": timestamp,
            "amount": 12.75,
            "type": kind
        }))
        .unwrap()
    }

    #[test]
    fn wallet_body_maps_to_snapshot() {
        let dto: WalletInfoDto =
            serde_json::from_value(json!({ "balance": { "amount": 150.25 }, "currency": "ARS" }))
                .unwrap();
        let snapshot = WalletSnapshot::from(dto);
        assert_eq!(snapshot.balance_amount, Decimal::new(15025, 2));
        assert_eq!(snapshot.currency_code, "ARS");
    }

    #[test]
    fn counterparty_depends_on_direction() {
        assert_eq!(record("OUT", "2024-05-01T10:00:00Z").counterparty().email, "bob@example.com");
        assert_eq!(record("IN", "2024-05-01T10:00:00Z").counterparty().email, "ann@example.com");
        let load = record("EXTERNAL_LOAD", "2024-05-01T10:00:00Z");
        assert_eq!(load.kind, TransferKind::ExternalLoad);
        assert_eq!(load.counterparty().email, "ann@example.com");
    }

    #[test]
    fn timestamps_with_and_without_offset_parse() {
        let zoned = record("IN", "2024-05-01T10:00:00-03:00").occurred_at().unwrap();
        assert_eq!(zoned.to_rfc3339(), "2024-05-01T13:00:00+00:00");

        let naive = record("IN", "2024-05-01T10:00:00.123456").occurred_at().unwrap();
        assert_eq!(naive.format("%H:%M:%S").to_string(), "10:00:00");

        assert!(record("IN", "yesterday").occurred_at().is_none());
    }

    #[test]
    fn submissions_serialize_amount_as_number() {
        let body = serde_json::to_value(TransferSubmission {
            to_email: "bob@example.com".into(),
            amount: Decimal::new(2550, 2),
        })
        .unwrap();
        assert_eq!(body, json!({ "toEmail": "bob@example.com", "amount": 25.5 }));

        let body = serde_json::to_value(DebinSubmission {
            external_service_name: "Banco Sur".into(),
            service_type: "BANK".into(),
            external_email: "ann@bank.example".into(),
            amount: Decimal::new(100, 0),
        })
        .unwrap();
        assert_eq!(body["externalServiceName"], "Banco Sur");
        assert_eq!(body["amount"], json!(100.0));
    }

    #[test]
    fn auth_token_is_found_in_either_shape() {
        let flat: AuthResponse = serde_json::from_value(json!({ "token": "abc" })).unwrap();
        assert_eq!(flat.session_token(), Some("abc"));

        let nested: AuthResponse = serde_json::from_value(json!({
            "success": true,
            "message": "ok",
            "user": { "id": "u1", "email": "ann@example.com", "token": "def" }
        }))
        .unwrap();
        assert_eq!(nested.session_token(), Some("def"));

        let none: AuthResponse = serde_json::from_value(json!({ "success": true })).unwrap();
        assert_eq!(none.session_token(), None);
    }
}
