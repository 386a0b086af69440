// Fabric (APIC-style) export loading
//
// The export format is a nested attribute/children document:
//   {"imdata": [{"fvAEPg": {"attributes": {...}, "children": [...]}}]}
// The engine only ever consumes flattened projections of it.

use std::collections::HashMap;

use baseliner_recon::model::{Record, RecordSet};
use serde_json::Value;

/// One object in the export tree: class name, string attributes, children.
#[derive(Debug, Clone, Default)]
pub struct FabricNode {
    pub class: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<FabricNode>,
}

impl FabricNode {
    pub fn attr(&self, name: &str) -> &str {
        self.attributes.get(name).map(String::as_str).unwrap_or("")
    }

    pub fn children_of_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a FabricNode> {
        self.children.iter().filter(move |c| c.class == class)
    }
}

#[derive(Debug, Clone, Default)]
pub struct FabricDoc {
    pub items: Vec<FabricNode>,
}

impl FabricDoc {
    pub fn items_of_class<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a FabricNode> {
        self.items.iter().filter(move |n| n.class == class)
    }
}

/// Parse a fabric export. A document without `imdata` is structurally
/// broken and fails the run; unexpected node shapes inside are skipped.
pub fn parse_str(json: &str) -> Result<FabricDoc, String> {
    let root: Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let imdata = root
        .get("imdata")
        .and_then(Value::as_array)
        .ok_or_else(|| "fabric export has no 'imdata' array".to_string())?;

    let items = imdata.iter().filter_map(parse_node).collect();
    Ok(FabricDoc { items })
}

fn parse_node(value: &Value) -> Option<FabricNode> {
    let obj = value.as_object()?;
    let (class, body) = obj.iter().next()?;

    let mut attributes = HashMap::new();
    if let Some(attrs) = body.get("attributes").and_then(Value::as_object) {
        for (k, v) in attrs {
            attributes.insert(k.clone(), attr_text(v));
        }
    }

    let children = body
        .get("children")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(parse_node).collect())
        .unwrap_or_default();

    Some(FabricNode { class: class.clone(), attributes, children })
}

fn attr_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Flattened projections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub epg: String,
    pub ip: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRole {
    Consumer,
    Provider,
}

impl std::fmt::Display for LinkRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Consumer => write!(f, "Consumer"),
            Self::Provider => write!(f, "Provider"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractLink {
    pub endpoint: String,
    pub contract: String,
    pub role: LinkRole,
    pub preferred_group: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContractEntry {
    pub name: String,
    pub descr: String,
}

/// (EPG, client-endpoint IP) pairs from `fvAEPg` / `fvCEp` nodes.
pub fn endpoints(doc: &FabricDoc) -> Vec<Endpoint> {
    let mut out = Vec::new();
    for epg in doc.items_of_class("fvAEPg") {
        let name = epg.attr("name");
        for cep in epg.children_of_class("fvCEp") {
            let ip = cep.attr("ip");
            if !ip.is_empty() {
                out.push(Endpoint { epg: name.to_string(), ip: ip.to_string() });
            }
        }
    }
    out
}

/// Consumer/provider contract links per EPG (`fvRsCons` / `fvRsProv`).
pub fn contract_links(doc: &FabricDoc) -> Vec<ContractLink> {
    let mut out = Vec::new();
    for epg in doc.items_of_class("fvAEPg") {
        let endpoint = epg.attr("name").to_string();
        let preferred_group = epg.attr("prefGrMemb").to_string();
        for child in &epg.children {
            let role = match child.class.as_str() {
                "fvRsCons" => LinkRole::Consumer,
                "fvRsProv" => LinkRole::Provider,
                _ => continue,
            };
            let contract = child.attr("tnVzBrCPName");
            if contract.is_empty() {
                continue;
            }
            out.push(ContractLink {
                endpoint: endpoint.clone(),
                contract: contract.to_string(),
                role,
                preferred_group: preferred_group.clone(),
            });
        }
    }
    out
}

/// The contract catalog from `vzBrCP` nodes.
pub fn contracts(doc: &FabricDoc) -> Vec<ContractEntry> {
    doc.items_of_class("vzBrCP")
        .map(|node| ContractEntry {
            name: node.attr("name").to_string(),
            descr: node.attr("descr").to_string(),
        })
        .collect()
}

// Record-set builders so projections drop straight into the CSV writer.

pub fn endpoint_records(doc: &FabricDoc) -> RecordSet {
    let mut set = RecordSet::new(vec!["EPG".into(), "IP".into()]);
    for ep in endpoints(doc) {
        set.push(Record::from_pairs([("EPG", ep.epg), ("IP", ep.ip)]));
    }
    set
}

pub fn contract_link_records(doc: &FabricDoc) -> RecordSet {
    let mut set = RecordSet::new(vec![
        "Endpoint Name".into(),
        "Type of Endpoint".into(),
        "Contract".into(),
        "Preferred Group".into(),
    ]);
    for link in contract_links(doc) {
        set.push(Record::from_pairs([
            ("Endpoint Name", link.endpoint),
            ("Type of Endpoint", link.role.to_string()),
            ("Contract", link.contract),
            ("Preferred Group", link.preferred_group),
        ]));
    }
    set
}

pub fn contract_records(doc: &FabricDoc) -> RecordSet {
    let mut set = RecordSet::new(vec!["Contract Name".into(), "Description".into()]);
    for entry in contracts(doc) {
        set.push(Record::from_pairs([
            ("Contract Name", entry.name),
            ("Description", entry.descr),
        ]));
    }
    set
}
