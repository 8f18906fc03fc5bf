//! Transaction requests and responses.
//!
//! Feature content and filters travel as raw markup: an insert carries its
//! feature elements serialized, filters carry the predicate inside
//! `fes:Filter`.

use serde::{Deserialize, Serialize};

use ogc_common::{OgcError, OgcResult};

use crate::types::{AllSome, UpdateAction, Value, DEFAULT_FORMAT, WFS_SERVICE, WFS_VERSION};
use crate::xml::{
    children, inner_xml, number, open_root, outer_xml, reader, resource_ids, text, value,
    write_filter, write_resource_ids, write_value, Attrs, Builder, Element, XmlReader,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Insert {
    /// Serialized feature elements.
    pub features: Vec<String>,
    pub handle: Option<String>,
    pub input_format: Option<String>,
    pub srs_name: Option<String>,
}

impl Insert {
    pub fn new<I, S>(features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            features: features.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn input_format(&self) -> &str {
        self.input_format.as_deref().unwrap_or(DEFAULT_FORMAT)
    }
}

/// New value (or removal) of one property in an Update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyUpdate {
    pub value_reference: String,
    pub action: Option<UpdateAction>,
    /// `None` sets the property to nil.
    pub value: Option<Value>,
}

impl PropertyUpdate {
    pub fn replace(value_reference: impl Into<String>, value: Value) -> Self {
        Self {
            value_reference: value_reference.into(),
            action: None,
            value: Some(value),
        }
    }

    pub fn remove(value_reference: impl Into<String>) -> Self {
        Self {
            value_reference: value_reference.into(),
            action: Some(UpdateAction::Remove),
            value: None,
        }
    }

    pub fn action(&self) -> UpdateAction {
        self.action.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Update {
    pub type_name: String,
    pub handle: Option<String>,
    pub input_format: Option<String>,
    pub srs_name: Option<String>,
    pub properties: Vec<PropertyUpdate>,
    pub filter: Option<String>,
}

impl Update {
    pub fn input_format(&self) -> &str {
        self.input_format.as_deref().unwrap_or(DEFAULT_FORMAT)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Delete {
    pub type_name: String,
    pub handle: Option<String>,
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Replace {
    /// Serialized replacement feature.
    pub feature: String,
    pub filter: String,
    pub handle: Option<String>,
    pub input_format: Option<String>,
    pub srs_name: Option<String>,
}

impl Replace {
    pub fn input_format(&self) -> &str {
        self.input_format.as_deref().unwrap_or(DEFAULT_FORMAT)
    }
}

/// Vendor specific action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Native {
    pub vendor_id: String,
    pub safe_to_ignore: bool,
    pub content: String,
    pub handle: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAction {
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Replace(Replace),
    Native(Native),
}

impl TransactionAction {
    pub fn handle(&self) -> Option<&str> {
        match self {
            TransactionAction::Insert(a) => a.handle.as_deref(),
            TransactionAction::Update(a) => a.handle.as_deref(),
            TransactionAction::Delete(a) => a.handle.as_deref(),
            TransactionAction::Replace(a) => a.handle.as_deref(),
            TransactionAction::Native(a) => a.handle.as_deref(),
        }
    }

    fn write(&self, xml: &mut Builder) -> OgcResult<()> {
        match self {
            TransactionAction::Insert(insert) => {
                let mut attrs = Attrs::new();
                attrs
                    .push_opt("handle", insert.handle.as_deref())
                    .push_opt("inputFormat", insert.input_format.as_deref())
                    .push_opt("srsName", insert.srs_name.as_deref());
                xml.start("wfs:Insert", &attrs.refs())?;
                for feature in &insert.features {
                    xml.raw(feature)?;
                }
                xml.end("wfs:Insert")?;
            }
            TransactionAction::Update(update) => {
                let mut attrs = Attrs::new();
                attrs
                    .push("typeName", update.type_name.as_str())
                    .push_opt("handle", update.handle.as_deref())
                    .push_opt("inputFormat", update.input_format.as_deref())
                    .push_opt("srsName", update.srs_name.as_deref());
                xml.start("wfs:Update", &attrs.refs())?;
                for property in &update.properties {
                    write_property_update(xml, property)?;
                }
                if let Some(filter) = &update.filter {
                    write_filter(xml, filter)?;
                }
                xml.end("wfs:Update")?;
            }
            TransactionAction::Delete(delete) => {
                let mut attrs = Attrs::new();
                attrs
                    .push("typeName", delete.type_name.as_str())
                    .push_opt("handle", delete.handle.as_deref());
                xml.start("wfs:Delete", &attrs.refs())?;
                write_filter(xml, &delete.filter)?;
                xml.end("wfs:Delete")?;
            }
            TransactionAction::Replace(replace) => {
                let mut attrs = Attrs::new();
                attrs
                    .push_opt("handle", replace.handle.as_deref())
                    .push_opt("inputFormat", replace.input_format.as_deref())
                    .push_opt("srsName", replace.srs_name.as_deref());
                xml.start("wfs:Replace", &attrs.refs())?;
                xml.raw(&replace.feature)?;
                write_filter(xml, &replace.filter)?;
                xml.end("wfs:Replace")?;
            }
            TransactionAction::Native(native) => {
                let mut attrs = Attrs::new();
                attrs
                    .push("vendorId", native.vendor_id.as_str())
                    .push("safeToIgnore", native.safe_to_ignore.to_string())
                    .push_opt("handle", native.handle.as_deref());
                xml.start("wfs:Native", &attrs.refs())?;
                xml.raw(&native.content)?;
                xml.end("wfs:Native")?;
            }
        }
        Ok(())
    }

    fn read(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<Option<Self>> {
        let action = match element.name.as_str() {
            "Insert" => {
                let mut insert = Insert {
                    features: Vec::new(),
                    handle: element.attr_string("handle"),
                    input_format: element.attr_string("inputFormat"),
                    srs_name: element.attr_string("srsName"),
                };
                children(reader, element, |r, child| {
                    insert.features.push(outer_xml(r, child)?);
                    Ok(true)
                })?;
                TransactionAction::Insert(insert)
            }
            "Update" => {
                let mut update = Update {
                    type_name: element.require_attr("typeName")?,
                    handle: element.attr_string("handle"),
                    input_format: element.attr_string("inputFormat"),
                    srs_name: element.attr_string("srsName"),
                    ..Default::default()
                };
                children(reader, element, |r, child| {
                    match child.name.as_str() {
                        "Property" => update.properties.push(read_property_update(r, child)?),
                        "Filter" => update.filter = Some(inner_xml(r, child)?),
                        _ => return Ok(false),
                    }
                    Ok(true)
                })?;
                TransactionAction::Update(update)
            }
            "Delete" => {
                let mut delete = Delete {
                    type_name: element.require_attr("typeName")?,
                    handle: element.attr_string("handle"),
                    filter: String::new(),
                };
                children(reader, element, |r, child| {
                    if child.name != "Filter" {
                        return Ok(false);
                    }
                    delete.filter = inner_xml(r, child)?;
                    Ok(true)
                })?;
                TransactionAction::Delete(delete)
            }
            "Replace" => {
                let mut replace = Replace {
                    handle: element.attr_string("handle"),
                    input_format: element.attr_string("inputFormat"),
                    srs_name: element.attr_string("srsName"),
                    ..Default::default()
                };
                children(reader, element, |r, child| {
                    if child.name == "Filter" {
                        replace.filter = inner_xml(r, child)?;
                    } else {
                        replace.feature = outer_xml(r, child)?;
                    }
                    Ok(true)
                })?;
                TransactionAction::Replace(replace)
            }
            "Native" => TransactionAction::Native(Native {
                vendor_id: element.require_attr("vendorId")?,
                safe_to_ignore: ogc_common::xml::parse_bool(element.attrs.get("safeToIgnore"))
                    .unwrap_or(false),
                handle: element.attr_string("handle"),
                content: inner_xml(reader, element)?,
            }),
            _ => return Ok(None),
        };
        Ok(Some(action))
    }
}

fn write_property_update(xml: &mut Builder, property: &PropertyUpdate) -> OgcResult<()> {
    xml.start("wfs:Property", &[])?;
    match property.action {
        Some(action) => {
            xml.start("wfs:ValueReference", &[("action", action.as_str())])?
                .text(&property.value_reference)?
                .end("wfs:ValueReference")?;
        }
        None => {
            xml.text_element("wfs:ValueReference", &property.value_reference)?;
        }
    }
    if let Some(value) = &property.value {
        write_value(xml, "wfs:Value", &[], value)?;
    }
    xml.end("wfs:Property")?;
    Ok(())
}

fn read_property_update(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<PropertyUpdate> {
    let mut property = PropertyUpdate {
        value_reference: String::new(),
        action: None,
        value: None,
    };
    children(reader, element, |r, child| {
        match child.name.as_str() {
            "ValueReference" => {
                property.action = child.attr_parse("action")?;
                property.value_reference = text(r, child)?;
            }
            "Value" => property.value = Some(value(r, child)?),
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(property)
}

/// A Transaction request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Transaction {
    pub service: Option<String>,
    pub version: Option<String>,
    pub handle: Option<String>,
    pub lock_id: Option<String>,
    pub release_action: Option<AllSome>,
    pub srs_name: Option<String>,
    pub actions: Vec<TransactionAction>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(&self) -> &str {
        self.service.as_deref().unwrap_or(WFS_SERVICE)
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(WFS_VERSION)
    }

    pub fn release_action(&self) -> AllSome {
        self.release_action.unwrap_or_default()
    }

    pub fn push(&mut self, action: TransactionAction) -> &mut Self {
        self.actions.push(action);
        self
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        if self.actions.is_empty() {
            return Err(OgcError::MissingParameter(
                "Insert, Update, Replace, Delete or Native action".to_string(),
            ));
        }

        let mut xml = Builder::new();
        xml.declaration()?;
        let mut attrs = Attrs::wfs_root();
        attrs
            .push("service", self.service())
            .push("version", self.version())
            .push_opt("handle", self.handle.as_deref())
            .push_opt("lockId", self.lock_id.as_deref())
            .push_opt("releaseAction", self.release_action)
            .push_opt("srsName", self.srs_name.as_deref());
        xml.start("wfs:Transaction", &attrs.refs())?;
        for action in &self.actions {
            action.write(&mut xml)?;
        }
        xml.end("wfs:Transaction")?;
        xml.into_string()
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "Transaction")?;

        let mut transaction = Transaction {
            service: root.attr_string("service"),
            version: root.attr_string("version"),
            handle: root.attr_string("handle"),
            lock_id: root.attr_string("lockId"),
            release_action: root.attr_parse("releaseAction")?,
            srs_name: root.attr_string("srsName"),
            actions: Vec::new(),
        };

        children(&mut reader, &root, |r, child| {
            match TransactionAction::read(r, child)? {
                Some(action) => {
                    transaction.actions.push(action);
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;

        Ok(transaction)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub total_inserted: u64,
    pub total_updated: u64,
    pub total_replaced: u64,
    pub total_deleted: u64,
}

/// Identifiers of the features created or modified by one action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionResult {
    /// Handle of the action these features belong to.
    pub handle: Option<String>,
    pub resource_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub version: Option<String>,
    pub summary: TransactionSummary,
    pub insert_results: Vec<ActionResult>,
    pub update_results: Vec<ActionResult>,
    pub replace_results: Vec<ActionResult>,
}

impl TransactionResponse {
    /// All inserted feature identifiers in document order.
    pub fn inserted_ids(&self) -> impl Iterator<Item = &str> {
        self.insert_results
            .iter()
            .flat_map(|r| r.resource_ids.iter().map(String::as_str))
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "TransactionResponse")?;

        let mut response = TransactionResponse {
            version: root.attr_string("version"),
            ..Default::default()
        };

        children(&mut reader, &root, |r, child| {
            match child.name.as_str() {
                "TransactionSummary" => response.summary = read_summary(r, child)?,
                "InsertResults" => response.insert_results = read_action_results(r, child)?,
                "UpdateResults" => response.update_results = read_action_results(r, child)?,
                "ReplaceResults" => response.replace_results = read_action_results(r, child)?,
                _ => return Ok(false),
            }
            Ok(true)
        })?;

        Ok(response)
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        let mut xml = Builder::new();
        xml.declaration()?;
        let mut attrs = Attrs::wfs_root();
        attrs.push("version", self.version.as_deref().unwrap_or(WFS_VERSION));
        xml.start("wfs:TransactionResponse", &attrs.refs())?;

        xml.start("wfs:TransactionSummary", &[])?;
        xml.text_element("wfs:totalInserted", &self.summary.total_inserted.to_string())?;
        xml.text_element("wfs:totalUpdated", &self.summary.total_updated.to_string())?;
        xml.text_element("wfs:totalReplaced", &self.summary.total_replaced.to_string())?;
        xml.text_element("wfs:totalDeleted", &self.summary.total_deleted.to_string())?;
        xml.end("wfs:TransactionSummary")?;

        for (name, results) in [
            ("wfs:InsertResults", &self.insert_results),
            ("wfs:UpdateResults", &self.update_results),
            ("wfs:ReplaceResults", &self.replace_results),
        ] {
            if results.is_empty() {
                continue;
            }
            xml.start(name, &[])?;
            for result in results {
                let mut attrs = Attrs::new();
                attrs.push_opt("handle", result.handle.as_deref());
                xml.start("wfs:Feature", &attrs.refs())?;
                write_resource_ids(&mut xml, &result.resource_ids)?;
                xml.end("wfs:Feature")?;
            }
            xml.end(name)?;
        }

        xml.end("wfs:TransactionResponse")?;
        xml.into_string()
    }
}

fn read_summary(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<TransactionSummary> {
    let mut summary = TransactionSummary::default();
    children(reader, element, |r, child| {
        match child.name.as_str() {
            "totalInserted" => summary.total_inserted = number(r, child)?,
            "totalUpdated" => summary.total_updated = number(r, child)?,
            "totalReplaced" => summary.total_replaced = number(r, child)?,
            "totalDeleted" => summary.total_deleted = number(r, child)?,
            _ => return Ok(false),
        }
        Ok(true)
    })?;
    Ok(summary)
}

fn read_action_results(reader: &mut XmlReader<'_>, element: &Element) -> OgcResult<Vec<ActionResult>> {
    let mut results = Vec::new();
    children(reader, element, |r, child| {
        if child.name != "Feature" {
            return Ok(false);
        }
        results.push(ActionResult {
            handle: child.attr_string("handle"),
            resource_ids: resource_ids(r, child)?,
        });
        Ok(true)
    })?;
    Ok(results)
}
