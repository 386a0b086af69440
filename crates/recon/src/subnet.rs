use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use indexmap::IndexMap;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use serde::Serialize;

use crate::model::Membership;

// ---------------------------------------------------------------------------
// Subnet table
// ---------------------------------------------------------------------------

/// A boundary entry that failed to parse. Reported to the caller, never
/// fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedBoundary {
    pub value: String,
    pub reason: String,
}

/// Ordered mapping from canonical boundary string to parsed network.
///
/// Iteration order is insertion order; lookups return the FIRST containing
/// entry, and duplicate boundary strings keep the first-inserted parse.
#[derive(Debug, Clone, Default)]
pub struct SubnetTable {
    entries: IndexMap<String, IpNet>,
}

impl SubnetTable {
    /// Build a table from boundary strings. Malformed entries are skipped
    /// and collected; blank rows are ignored.
    pub fn build<I, S>(rows: I) -> (Self, Vec<SkippedBoundary>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entries = IndexMap::new();
        let mut skipped = Vec::new();

        for row in rows {
            let raw = row.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            match parse_boundary(raw) {
                Ok(net) => {
                    if !entries.contains_key(raw) {
                        entries.insert(raw.to_string(), net);
                    }
                }
                Err(reason) => skipped.push(SkippedBoundary {
                    value: raw.to_string(),
                    reason,
                }),
            }
        }

        (Self { entries }, skipped)
    }

    /// First entry (in insertion order) that contains `net`. Containment
    /// covers exact equality and proper subsets; a V4 query never matches a
    /// V6 entry and vice versa.
    pub fn first_containing(&self, net: &IpNet) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.contains(net))
            .map(|(key, _)| key.as_str())
    }

    /// First entry that overlaps `net` in either direction. Used for the
    /// `rfc-1918` keyword, where the baseline entry is usually the smaller
    /// network.
    pub fn first_overlapping(&self, net: &IpNet) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, entry)| nets_overlap(entry, net))
            .map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &IpNet)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse a boundary string: CIDR when it carries a prefix, otherwise a bare
/// address treated as a host network (/32 or /128).
fn parse_boundary(raw: &str) -> Result<IpNet, String> {
    if raw.contains('/') {
        return IpNet::from_str(raw)
            .map(|net| net.trunc())
            .map_err(|e| e.to_string());
    }
    match IpAddr::from_str(raw) {
        Ok(IpAddr::V4(v4)) => Ok(IpNet::V4(Ipv4Net::new(v4, 32).unwrap())),
        Ok(IpAddr::V6(v6)) => Ok(IpNet::V6(Ipv6Net::new(v6, 128).unwrap())),
        Err(e) => Err(e.to_string()),
    }
}

/// Two CIDR networks overlap iff one contains the other's base address.
fn nets_overlap(a: &IpNet, b: &IpNet) -> bool {
    a.contains(&b.addr()) || b.contains(&a.addr())
}

fn rfc1918_ranges() -> [IpNet; 3] {
    [
        IpNet::V4(Ipv4Net::new(Ipv4Addr::new(10, 0, 0, 0), 8).unwrap()),
        IpNet::V4(Ipv4Net::new(Ipv4Addr::new(172, 16, 0, 0), 12).unwrap()),
        IpNet::V4(Ipv4Net::new(Ipv4Addr::new(192, 168, 0, 0), 16).unwrap()),
    ]
}

// ---------------------------------------------------------------------------
// Address expressions
// ---------------------------------------------------------------------------

/// Wildcard tokens accepted in address fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    /// Matches any table unconditionally.
    Any,
    /// Matches when a table entry overlaps a private IPv4 range.
    Rfc1918,
}

/// One token of an address field, as a tagged value rather than string
/// sniffing at the point of use.
#[derive(Debug, Clone, PartialEq)]
pub enum AddrExpr {
    Literal(IpNet),
    Keyword(Keyword),
    Negated(Box<AddrExpr>),
    /// Kept for evidence; never matches anything.
    Unparsed(String),
}

const NEGATE_MARKER: &str = "[negate]";

impl AddrExpr {
    pub fn parse(raw: &str) -> AddrExpr {
        let token = raw.trim().trim_matches(|c| c == '"' || c == '\'').trim();

        let negate_prefix = token
            .get(..NEGATE_MARKER.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(NEGATE_MARKER));
        if negate_prefix.is_some() {
            let inner = &token[NEGATE_MARKER.len()..];
            return AddrExpr::Negated(Box::new(AddrExpr::parse(inner)));
        }

        if token.eq_ignore_ascii_case("any") {
            return AddrExpr::Keyword(Keyword::Any);
        }
        if token.eq_ignore_ascii_case("rfc-1918") || token.eq_ignore_ascii_case("rfc1918") {
            return AddrExpr::Keyword(Keyword::Rfc1918);
        }

        match parse_boundary(token) {
            Ok(net) => AddrExpr::Literal(net),
            Err(_) => AddrExpr::Unparsed(token.to_string()),
        }
    }

    pub fn is_negated(&self) -> bool {
        matches!(self, AddrExpr::Negated(_))
    }

    /// The expression under any negation markers.
    pub fn inner(&self) -> &AddrExpr {
        match self {
            AddrExpr::Negated(inner) => inner.inner(),
            other => other,
        }
    }

    /// Positive table membership of this expression. Negated expressions
    /// never match here — negation is resolved at the verdict level.
    pub fn membership(&self, table: &SubnetTable) -> Membership {
        match self {
            AddrExpr::Keyword(Keyword::Any) => Membership::Any,
            AddrExpr::Keyword(Keyword::Rfc1918) => rfc1918_ranges()
                .iter()
                .find_map(|range| table.first_overlapping(range))
                .map(|subnet| Membership::Subnet(subnet.to_string()))
                .unwrap_or(Membership::NoMatch),
            AddrExpr::Literal(net) => table
                .first_containing(net)
                .map(|subnet| Membership::Subnet(subnet.to_string()))
                .unwrap_or(Membership::NoMatch),
            AddrExpr::Negated(_) | AddrExpr::Unparsed(_) => Membership::NoMatch,
        }
    }
}

/// Split a field into address tokens. Both `;` and `,` act as separators;
/// blank tokens are dropped.
pub fn split_expressions(field: &str) -> impl Iterator<Item = &str> {
    field
        .split(|c| c == ';' || c == ',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Classify a single address or a delimited address list against the table.
/// Returns the first positive match in token order, then table order.
/// Invalid syntax yields `NoMatch`, never an error.
pub fn classify_address(field: &str, table: &SubnetTable) -> Membership {
    for token in split_expressions(field) {
        let expr = AddrExpr::parse(token);
        let membership = expr.membership(table);
        if membership.is_match() {
            return membership;
        }
    }
    Membership::NoMatch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&str]) -> SubnetTable {
        SubnetTable::build(rows.iter().copied()).0
    }

    #[test]
    fn build_skips_malformed_entries() {
        let (table, skipped) =
            SubnetTable::build(["10.0.0.0/8", "not-a-subnet", "", "192.168.1.0/24"]);
        assert_eq!(table.len(), 2);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].value, "not-a-subnet");
    }

    #[test]
    fn bare_address_becomes_host_network() {
        let t = table(&["172.31.40.17"]);
        let net: IpNet = "172.31.40.17/32".parse().unwrap();
        assert_eq!(t.first_containing(&net), Some("172.31.40.17"));
    }

    #[test]
    fn address_in_subnet_matches() {
        let t = table(&["10.0.0.0/8"]);
        assert_eq!(
            classify_address("10.1.2.3", &t),
            Membership::Subnet("10.0.0.0/8".into())
        );
    }

    #[test]
    fn address_outside_table_is_no_match() {
        let t = table(&["10.0.0.0/8", "192.168.0.0/16"]);
        assert_eq!(classify_address("8.8.8.8", &t), Membership::NoMatch);
    }

    #[test]
    fn containment_is_reflexive() {
        let t = table(&["10.96.0.0/13"]);
        assert_eq!(
            classify_address("10.96.0.0/13", &t),
            Membership::Subnet("10.96.0.0/13".into())
        );
    }

    #[test]
    fn proper_subset_is_contained() {
        // a /28 inside a /13 baseline
        let t = table(&["10.96.0.0/13"]);
        assert_eq!(
            classify_address("10.97.40.16/28", &t),
            Membership::Subnet("10.96.0.0/13".into())
        );
    }

    #[test]
    fn first_inserted_subnet_wins() {
        let t = table(&["10.0.0.0/8", "10.1.0.0/16"]);
        assert_eq!(
            classify_address("10.1.2.3", &t),
            Membership::Subnet("10.0.0.0/8".into())
        );
    }

    #[test]
    fn v4_never_matches_v6_entry() {
        let t = table(&["2001:db8::/32"]);
        assert_eq!(classify_address("10.1.2.3", &t), Membership::NoMatch);
        let t4 = table(&["10.0.0.0/8"]);
        assert_eq!(classify_address("2001:db8::1", &t4), Membership::NoMatch);
    }

    #[test]
    fn any_always_matches() {
        let empty = table(&[]);
        assert_eq!(classify_address("any", &empty), Membership::Any);
        assert_eq!(classify_address(" ANY ", &empty), Membership::Any);
    }

    #[test]
    fn rfc1918_matches_private_baseline() {
        let t = table(&["10.96.0.0/13"]);
        assert_eq!(
            classify_address("rfc-1918", &t),
            Membership::Subnet("10.96.0.0/13".into())
        );
        let public = table(&["203.0.113.0/24"]);
        assert_eq!(classify_address("rfc-1918", &public), Membership::NoMatch);
    }

    #[test]
    fn invalid_syntax_is_no_match_not_error() {
        let t = table(&["10.0.0.0/8"]);
        assert_eq!(classify_address("definitely-not-an-ip", &t), Membership::NoMatch);
        assert_eq!(classify_address("", &t), Membership::NoMatch);
    }

    #[test]
    fn delimited_list_first_match_wins() {
        let t = table(&["192.168.0.0/16"]);
        assert_eq!(
            classify_address("8.8.8.8;192.168.4.1;10.0.0.1", &t),
            Membership::Subnet("192.168.0.0/16".into())
        );
        // comma-delimited works too
        assert_eq!(
            classify_address("8.8.8.8, 192.168.4.1", &t),
            Membership::Subnet("192.168.0.0/16".into())
        );
    }

    #[test]
    fn negated_token_does_not_match_positively() {
        let t = table(&["10.0.0.0/8"]);
        assert_eq!(classify_address("[negate] 10.1.2.3", &t), Membership::NoMatch);
        let expr = AddrExpr::parse("[NEGATE] rfc-1918");
        assert!(expr.is_negated());
        assert_eq!(expr.inner(), &AddrExpr::Keyword(Keyword::Rfc1918));
    }

    #[test]
    fn quoted_tokens_are_unwrapped() {
        let t = table(&["10.0.0.0/8"]);
        assert_eq!(
            classify_address("'10.1.2.3'", &t),
            Membership::Subnet("10.0.0.0/8".into())
        );
        assert_eq!(classify_address("\"any\"", &t), Membership::Any);
    }

    #[test]
    fn host_bits_are_truncated_for_containment() {
        // 10.1.2.3/8 normalizes to 10.0.0.0/8
        let t = table(&["10.1.2.3/8"]);
        assert_eq!(
            classify_address("10.200.0.1", &t),
            Membership::Subnet("10.1.2.3/8".into())
        );
    }
}
