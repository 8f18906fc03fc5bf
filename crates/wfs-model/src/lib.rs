//! WFS 2.0 documents as plain Rust types.
//!
//! Requests serialize to XML (`to_xml`) and, where the protocol allows it, to
//! KVP query parameters (`to_kvp`); responses parse from XML (`from_xml`).
//! Optional attributes stay unset in the model and in the documents written
//! from it. Accessor methods apply the schema defaults:
//!
//! ```ignore
//! use wfs_model::{GetFeature, Query, ResultType};
//!
//! let request = GetFeature::new(Query::new("topp:states"));
//! assert_eq!(request.result_type(), ResultType::Results);
//! assert_eq!(request.output_format(), "application/gml+xml; version=3.2");
//! let xml = request.to_xml()?;
//! ```
//!
//! A response document that turns out to be an OWS exception report parses
//! into [`OgcError::ServiceException`].

pub mod exception;
pub mod feature;
pub mod get_feature;
pub mod lock;
pub mod query;
pub mod stored_query;
pub mod transaction;
pub mod types;
mod xml;

pub use exception::{ExceptionReport, OwsException};
pub use feature::{Feature, FeatureCollection, NumberMatched, Property};
pub use get_feature::{GetFeature, GetPropertyValue};
pub use lock::{LockFeature, LockFeatureResponse};
pub use query::{Parameter, Query, QueryExpression, SortProperty, StoredQuery};
pub use stored_query::{
    CreateStoredQuery, DescribeStoredQueries, DescribeStoredQueriesResponse, DropStoredQuery,
    ExecutionStatus, ListStoredQueries, ListStoredQueriesResponse, ParameterExpression,
    QueryExpressionText, StoredQueryDescription, StoredQueryListItem,
};
pub use transaction::{
    ActionResult, Delete, Insert, Native, PropertyUpdate, Replace, Transaction, TransactionAction,
    TransactionResponse, TransactionSummary, Update,
};
pub use types::{
    AllSome, LanguageString, ResolveValue, ResultType, SortOrder, UpdateAction, Value,
    DEFAULT_FORMAT,
};
pub use xml::{FES_NAMESPACE, GML_NAMESPACE, OWS_NAMESPACE, WFS_NAMESPACE};

pub use ogc_common::{OgcError, OgcResult, QueryParams};
