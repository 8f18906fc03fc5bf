//! LockFeature request and response.

use serde::{Deserialize, Serialize};

use ogc_common::{OgcError, OgcResult, QueryParams};

use crate::query::{queries_to_kvp, write_queries, QueryExpression};
use crate::types::{AllSome, DEFAULT_LOCK_EXPIRY, WFS_SERVICE, WFS_VERSION};
use crate::xml::{
    children, open_root, reader, resource_ids, write_resource_ids, Attrs, Builder,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockFeature {
    pub service: Option<String>,
    pub version: Option<String>,
    pub handle: Option<String>,
    /// Existing lock to renew.
    pub lock_id: Option<String>,
    /// Seconds until the lock is released.
    pub expiry: Option<u64>,
    pub lock_action: Option<AllSome>,
    pub queries: Vec<QueryExpression>,
}

impl LockFeature {
    pub fn new(query: impl Into<QueryExpression>) -> Self {
        Self {
            queries: vec![query.into()],
            ..Default::default()
        }
    }

    pub fn service(&self) -> &str {
        self.service.as_deref().unwrap_or(WFS_SERVICE)
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or(WFS_VERSION)
    }

    pub fn expiry(&self) -> u64 {
        self.expiry.unwrap_or(DEFAULT_LOCK_EXPIRY)
    }

    pub fn lock_action(&self) -> AllSome {
        self.lock_action.unwrap_or_default()
    }

    pub fn to_xml(&self) -> OgcResult<String> {
        if self.queries.is_empty() && self.lock_id.is_none() {
            return Err(OgcError::MissingParameter("Query".to_string()));
        }

        let mut xml = Builder::new();
        xml.declaration()?;
        let mut attrs = Attrs::wfs_root();
        attrs
            .push("service", self.service())
            .push("version", self.version())
            .push_opt("handle", self.handle.as_deref())
            .push_opt("lockId", self.lock_id.as_deref())
            .push_opt("expiry", self.expiry)
            .push_opt("lockAction", self.lock_action);
        xml.start("wfs:LockFeature", &attrs.refs())?;
        write_queries(&mut xml, &self.queries)?;
        xml.end("wfs:LockFeature")?;
        xml.into_string()
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "LockFeature")?;

        let mut request = LockFeature {
            service: root.attr_string("service"),
            version: root.attr_string("version"),
            handle: root.attr_string("handle"),
            lock_id: root.attr_string("lockId"),
            expiry: root.attr_parse("expiry")?,
            lock_action: root.attr_parse("lockAction")?,
            queries: Vec::new(),
        };

        children(&mut reader, &root, |r, child| {
            match QueryExpression::read(r, child)? {
                Some(query) => {
                    request.queries.push(query);
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;

        Ok(request)
    }

    pub fn to_kvp(&self) -> OgcResult<QueryParams> {
        let mut params = QueryParams::new();
        params.set("SERVICE", self.service());
        params.set("VERSION", self.version());
        params.set("REQUEST", "LockFeature");
        params.set_opt("LOCKID", self.lock_id.as_deref());
        params.set_opt("EXPIRY", self.expiry.map(|e| e.to_string()));
        params.set_opt("LOCKACTION", self.lock_action.map(|a| a.to_string()));

        // Renewing a lock needs no query
        if !(self.queries.is_empty() && self.lock_id.is_some()) {
            queries_to_kvp(&self.queries, &mut params)?;
        }
        Ok(params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockFeatureResponse {
    pub lock_id: Option<String>,
    pub features_locked: Vec<String>,
    pub features_not_locked: Vec<String>,
}

impl LockFeatureResponse {
    /// Whether every requested feature was locked.
    pub fn is_complete(&self) -> bool {
        self.features_not_locked.is_empty()
    }

    pub fn from_xml(xml: &str) -> OgcResult<Self> {
        let mut reader = reader(xml);
        let root = open_root(&mut reader, "LockFeatureResponse")?;

        let mut response = LockFeatureResponse {
            lock_id: root.attr_string("lockId"),
            ..Default::default()
        };

        children(&mut reader, &root, |r, child| {
            match child.name.as_str() {
                "FeaturesLocked" => response.features_locked = resource_ids(r, child)?,
                "FeaturesNotLocked" => response.features_not_locked = resource_ids(r, child)?,
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
        attrs.push_opt("lockId", self.lock_id.as_deref());
        xml.start("wfs:LockFeatureResponse", &attrs.refs())?;
        if !self.features_locked.is_empty() {
            xml.start("wfs:FeaturesLocked", &[])?;
            write_resource_ids(&mut xml, &self.features_locked)?;
            xml.end("wfs:FeaturesLocked")?;
        }
        if !self.features_not_locked.is_empty() {
            xml.start("wfs:FeaturesNotLocked", &[])?;
            write_resource_ids(&mut xml, &self.features_not_locked)?;
            xml.end("wfs:FeaturesNotLocked")?;
        }
        xml.end("wfs:LockFeatureResponse")?;
        xml.into_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;

    #[test]
    fn test_defaults() {
        let request = LockFeature::new(Query::new("topp:states"));
        assert_eq!(request.expiry(), 300);
        assert_eq!(request.lock_action(), AllSome::All);

        let xml = request.to_xml().unwrap();
        assert!(!xml.contains("expiry"));
        assert!(!xml.contains("lockAction"));
    }

    #[test]
    fn test_round_trip() {
        let mut request = LockFeature::new(
            Query::new("topp:states").with_filter("<fes:ResourceId rid=\"states.1\"/>"),
        );
        request.expiry = Some(60);
        request.lock_action = Some(AllSome::Some);
        request.handle = Some("lock-states".to_string());

        let parsed = LockFeature::from_xml(&request.to_xml().unwrap()).unwrap();
        assert_eq!(parsed.queries, request.queries);
        assert_eq!(parsed.expiry(), 60);
        assert_eq!(parsed.lock_action(), AllSome::Some);
        assert_eq!(parsed.handle, request.handle);
    }

    #[test]
    fn test_to_kvp() {
        let mut request = LockFeature::new(Query::new("topp:states"));
        request.expiry = Some(120);
        let params = request.to_kvp().unwrap();
        assert_eq!(params.get("REQUEST"), Some("LockFeature"));
        assert_eq!(params.get("EXPIRY"), Some("120"));
        assert_eq!(params.get("LOCKACTION"), None);
        assert_eq!(params.get("TYPENAMES"), Some("topp:states"));
    }

    #[test]
    fn test_lock_renewal_needs_no_query() {
        let request = LockFeature {
            lock_id: Some("lock-42".to_string()),
            ..Default::default()
        };
        assert!(request.to_xml().is_ok());
        assert_eq!(request.to_kvp().unwrap().get("LOCKID"), Some("lock-42"));
        assert!(LockFeature::default().to_kvp().is_err());
    }

    #[test]
    fn test_response_round_trip() {
        let response = LockFeatureResponse {
            lock_id: Some("lock-1".to_string()),
            features_locked: vec!["states.1".to_string()],
            features_not_locked: vec!["states.2".to_string()],
        };
        let parsed = LockFeatureResponse::from_xml(&response.to_xml().unwrap()).unwrap();
        assert_eq!(parsed, response);
        assert!(!parsed.is_complete());
    }
}
