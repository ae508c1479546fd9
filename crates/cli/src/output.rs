//! Human-readable and JSON rendering of registry values.

use anyhow::Result;
use notary_registry::{AccessGrant, AuditReport, Dispute, Registration, TransferRecord};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write;

/// A command result, ready to print either as pretty JSON or as text.
#[derive(Debug)]
pub struct Rendered {
    pub value: Value,
    pub text: String,
}

impl Rendered {
    pub fn new<T: Serialize + ?Sized>(value: &T, text: String) -> Result<Self> {
        Ok(Self {
            value: serde_json::to_value(value)?,
            text,
        })
    }

    pub fn print(&self, json: bool) -> Result<()> {
        if json {
            println!("{}", serde_json::to_string_pretty(&self.value)?);
        } else if !self.text.is_empty() {
            println!("{}", self.text);
        }
        Ok(())
    }
}

pub fn registration(r: &Registration) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Registration #{}", r.id);
    let _ = writeln!(out, "  owner:        {}", r.owner);
    let _ = writeln!(out, "  content hash: {}", r.content_hash);
    let _ = writeln!(out, "  title:        {}", r.title);
    let _ = writeln!(out, "  description:  {}", r.description);
    if !r.metadata_uri.is_empty() {
        let _ = writeln!(out, "  metadata uri: {}", r.metadata_uri);
    }
    let _ = write!(out, "  registered:   {}", r.registered_at);
    out
}

pub fn registration_line(r: &Registration) -> String {
    format!("#{} {}  {}  {}", r.id, r.owner, r.content_hash, r.title)
}

pub fn registration_list(items: &[Registration]) -> String {
    if items.is_empty() {
        return "no registrations".to_string();
    }
    items
        .iter()
        .map(registration_line)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn grant(g: &AccessGrant) -> String {
    match g.expires_at {
        Some(expires_at) => format!(
            "#{} -> {}  license until {} (granted {})",
            g.registration_id, g.grantee, expires_at, g.granted_at
        ),
        None => format!(
            "#{} -> {}  permanent (granted {})",
            g.registration_id, g.grantee, g.granted_at
        ),
    }
}

pub fn grant_list(items: &[AccessGrant]) -> String {
    if items.is_empty() {
        return "no active grants".to_string();
    }
    items.iter().map(grant).collect::<Vec<_>>().join("\n")
}

pub fn transfer(t: &TransferRecord) -> String {
    format!("#{} {} -> {} at {}", t.registration_id, t.from, t.to, t.at)
}

pub fn transfer_list(items: &[TransferRecord]) -> String {
    if items.is_empty() {
        return "no transfers".to_string();
    }
    items.iter().map(transfer).collect::<Vec<_>>().join("\n")
}

pub fn dispute(d: &Dispute) -> String {
    let mut line = format!(
        "dispute {} on #{} by {} opened {}: {}",
        d.id, d.registration_id, d.claimant, d.opened_at, d.reason
    );
    match &d.resolution {
        Some(resolution) => {
            let _ = write!(
                line,
                " [{} by {} at {}]",
                resolution.outcome, resolution.resolver, resolution.resolved_at
            );
        }
        None => line.push_str(" [open]"),
    }
    line
}

pub fn dispute_list(items: &[Dispute]) -> String {
    if items.is_empty() {
        return "no disputes".to_string();
    }
    items.iter().map(dispute).collect::<Vec<_>>().join("\n")
}

pub fn audit(report: &AuditReport) -> String {
    let mut out = registration(&report.registration);
    let _ = write!(out, "\n  registrant:   {}", report.registrant);
    let _ = write!(out, "\n  audited:      {}", report.audited_at);

    let _ = write!(out, "\nTransfers ({}):", report.transfers.len());
    for t in &report.transfers {
        let _ = write!(out, "\n  {}", transfer(t));
    }
    let _ = write!(out, "\nActive grants ({}):", report.active_grants.len());
    for g in &report.active_grants {
        let _ = write!(out, "\n  {}", grant(g));
    }
    let _ = write!(out, "\nDisputes ({}):", report.disputes.len());
    for d in &report.disputes {
        let _ = write!(out, "\n  {}", dispute(d));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use notary_registry::{DisputeOutcome, DisputeStatus, Resolution};
    use notary_time::Timestamp;
    use notary_types::{Address, ContentHash, DisputeId, RegistrationId};

    fn sample() -> Registration {
        Registration {
            id: RegistrationId(7),
            owner: Address([0x11; 20]),
            content_hash: ContentHash::new("QmSample"),
            title: "Deed".into(),
            description: "Signed deed".into(),
            metadata_uri: String::new(),
            registered_at: Timestamp(42),
        }
    }

    #[test]
    fn test_registration_skips_empty_uri() {
        let text = registration(&sample());
        assert!(text.starts_with("Registration #7"));
        assert!(text.contains("QmSample"));
        assert!(!text.contains("metadata uri"));
    }

    #[test]
    fn test_grant_distinguishes_licenses() {
        let mut g = AccessGrant {
            registration_id: RegistrationId(7),
            grantee: Address([0x22; 20]),
            granted_at: Timestamp(10),
            expires_at: None,
        };
        assert!(grant(&g).contains("permanent"));
        g.expires_at = Some(Timestamp(3_610));
        assert!(grant(&g).contains("license until 3610s"));
    }

    #[test]
    fn test_dispute_shows_resolution() {
        let mut d = Dispute {
            id: DisputeId(1),
            registration_id: RegistrationId(7),
            claimant: Address([0x33; 20]),
            reason: "prior art".into(),
            opened_at: Timestamp(50),
            status: DisputeStatus::Open,
            resolution: None,
        };
        assert!(dispute(&d).ends_with("[open]"));

        d.status = DisputeStatus::Resolved;
        d.resolution = Some(Resolution {
            resolver: Address([0x44; 20]),
            outcome: DisputeOutcome::Upheld,
            resolved_at: Timestamp(60),
        });
        assert!(dispute(&d).contains("[upheld by"));
    }

    #[test]
    fn test_empty_lists() {
        assert_eq!(registration_list(&[]), "no registrations");
        assert_eq!(grant_list(&[]), "no active grants");
        assert_eq!(dispute_list(&[]), "no disputes");
        assert_eq!(transfer_list(&[]), "no transfers");
    }
}
