//! Parameter records that construct feature backends, and the name-keyed
//! registry used to rebuild them from JSON or TOML documents.
//!
//! Documents use one single-key object per record, the key being the record
//! type name:
//!
//! ```json
//! {"AIFParameters": [{"OrbParameters": {"threshold": 20}}]}
//! ```

use std::sync::Arc;

use aif_core::FeatureBackend;
use aif_orb::{OrbFeature, OrbParameters, PatchFeature, PatchParameters};

use crate::affine_feature::AffineInvariantFeature;
use crate::combined::CombinedFeature;
use crate::error::{DetectError, DetectResult};

#[cfg(feature = "serde")]
use serde_json::{Map, Value};

/// A parameter record that knows how to build its backend
pub trait FeatureParameters: std::fmt::Debug + Send + Sync {
    /// Type name used as the record key in documents and the registry
    fn default_name(&self) -> &'static str;

    /// Build the backend; `None` when the record describes no backend
    fn create_feature(&self) -> DetectResult<Option<Arc<dyn FeatureBackend>>>;

    /// Record body without the type-name key
    #[cfg(feature = "serde")]
    fn to_value(&self) -> DetectResult<Value>;
}

impl FeatureParameters for OrbParameters {
    fn default_name(&self) -> &'static str {
        "OrbParameters"
    }

    fn create_feature(&self) -> DetectResult<Option<Arc<dyn FeatureBackend>>> {
        Ok(Some(Arc::new(OrbFeature::new(self.clone())?)))
    }

    #[cfg(feature = "serde")]
    fn to_value(&self) -> DetectResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl FeatureParameters for PatchParameters {
    fn default_name(&self) -> &'static str {
        "PatchParameters"
    }

    fn create_feature(&self) -> DetectResult<Option<Arc<dyn FeatureBackend>>> {
        Ok(Some(Arc::new(PatchFeature::new(self.clone())?)))
    }

    #[cfg(feature = "serde")]
    fn to_value(&self) -> DetectResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Ordered list of child records describing the base of an
/// [`AffineInvariantFeature`]: none, one backend, or two combined backends.
#[derive(Debug, Default)]
pub struct AifParameters {
    children: Vec<Box<dyn FeatureParameters>>,
}

impl AifParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, child: impl FeatureParameters + 'static) -> Self {
        self.children.push(Box::new(child));
        self
    }

    pub fn push(&mut self, child: Box<dyn FeatureParameters>) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[Box<dyn FeatureParameters>] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Backend the affine sampler wraps
    pub fn create_base(&self) -> DetectResult<Option<Arc<dyn FeatureBackend>>> {
        match self.children.as_slice() {
            [] => Ok(None),
            [only] => only.create_feature(),
            [first, second] => {
                let first = first.create_feature()?.ok_or(DetectError::MissingBackend)?;
                let second = second.create_feature()?.ok_or(DetectError::MissingBackend)?;
                Ok(Some(Arc::new(CombinedFeature::new(first, second)?)))
            }
            more => Err(DetectError::TooManyBackends(more.len())),
        }
    }

    pub fn summary(&self) -> String {
        let names: Vec<&str> = self.children.iter().map(|c| c.default_name()).collect();
        format!("AIFParameters: [{}]", names.join(", "))
    }
}

#[cfg(feature = "serde")]
impl AifParameters {
    fn from_body(body: &Value) -> DetectResult<Self> {
        let items = body.as_array().ok_or_else(|| {
            DetectError::Serialization("AIFParameters must hold a list of records".to_string())
        })?;
        let mut params = Self::new();
        for item in items {
            params.push(load_parameters(item)?);
        }
        Ok(params)
    }

    /// Full document, `{"AIFParameters": [...]}`
    pub fn to_document(&self) -> DetectResult<Value> {
        to_node(self)
    }

    pub fn from_document(doc: &Value) -> DetectResult<Self> {
        let (name, body) = single_entry(doc)?;
        if name != AIF_NAME {
            return Err(DetectError::UnknownParameters(name.to_string()));
        }
        Self::from_body(body)
    }

    pub fn to_json(&self) -> DetectResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document()?)?)
    }

    pub fn from_json(json: &str) -> DetectResult<Self> {
        let doc: Value = serde_json::from_str(json)?;
        Self::from_document(&doc)
    }

    pub fn to_toml(&self) -> DetectResult<String> {
        Ok(toml::to_string_pretty(&self.to_document()?)?)
    }

    pub fn from_toml(toml_str: &str) -> DetectResult<Self> {
        let doc: Value = toml::from_str(toml_str)?;
        Self::from_document(&doc)
    }
}

const AIF_NAME: &str = "AIFParameters";

impl FeatureParameters for AifParameters {
    fn default_name(&self) -> &'static str {
        AIF_NAME
    }

    fn create_feature(&self) -> DetectResult<Option<Arc<dyn FeatureBackend>>> {
        Ok(self
            .create_base()?
            .map(|base| Arc::new(AffineInvariantFeature::new(base)) as Arc<dyn FeatureBackend>))
    }

    #[cfg(feature = "serde")]
    fn to_value(&self) -> DetectResult<Value> {
        let items = self
            .children
            .iter()
            .map(|child| to_node(child.as_ref()))
            .collect::<DetectResult<Vec<Value>>>()?;
        Ok(Value::Array(items))
    }
}

/// Wrap a record body under its type name
#[cfg(feature = "serde")]
pub fn to_node(params: &dyn FeatureParameters) -> DetectResult<Value> {
    let mut node = Map::new();
    node.insert(params.default_name().to_string(), params.to_value()?);
    Ok(Value::Object(node))
}

#[cfg(feature = "serde")]
fn single_entry(node: &Value) -> DetectResult<(&str, &Value)> {
    match node.as_object() {
        Some(map) if map.len() == 1 => map
            .iter()
            .next()
            .map(|(name, body)| (name.as_str(), body))
            .ok_or_else(|| DetectError::Serialization("empty record".to_string())),
        _ => Err(DetectError::Serialization(
            "a record must be an object with exactly one type name".to_string(),
        )),
    }
}

type CreateFn = fn() -> Box<dyn FeatureParameters>;
#[cfg(feature = "serde")]
type LoadFn = fn(&Value) -> DetectResult<Box<dyn FeatureParameters>>;

#[derive(Clone, Copy)]
struct RegistryEntry {
    name: &'static str,
    create: CreateFn,
    #[cfg(feature = "serde")]
    load: LoadFn,
}

/// Type name to record constructor table
#[derive(Clone)]
pub struct ParameterRegistry {
    entries: Vec<RegistryEntry>,
}

impl ParameterRegistry {
    /// Registry of every record type this crate provides
    pub fn builtin() -> Self {
        let entries = vec![
            RegistryEntry {
                name: AIF_NAME,
                create: || Box::new(AifParameters::new()),
                #[cfg(feature = "serde")]
                load: |body| Ok(Box::new(AifParameters::from_body(body)?)),
            },
            RegistryEntry {
                name: "OrbParameters",
                create: || Box::new(OrbParameters::defaults()),
                #[cfg(feature = "serde")]
                load: |body| {
                    let params: OrbParameters = serde_json::from_value(body.clone())?;
                    params.validate()?;
                    Ok(Box::new(params))
                },
            },
            RegistryEntry {
                name: "PatchParameters",
                create: || Box::new(PatchParameters::defaults()),
                #[cfg(feature = "serde")]
                load: |body| {
                    let params: PatchParameters = serde_json::from_value(body.clone())?;
                    params.validate()?;
                    Ok(Box::new(params))
                },
            },
        ];
        Self { entries }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|e| e.name)
    }

    fn entry(&self, name: &str) -> DetectResult<&RegistryEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| DetectError::UnknownParameters(name.to_string()))
    }

    /// Default record of type `name`
    pub fn create(&self, name: &str) -> DetectResult<Box<dyn FeatureParameters>> {
        Ok((self.entry(name)?.create)())
    }

    /// Record from a single-key `{name: body}` node
    #[cfg(feature = "serde")]
    pub fn load(&self, node: &Value) -> DetectResult<Box<dyn FeatureParameters>> {
        let (name, body) = single_entry(node)?;
        (self.entry(name)?.load)(body)
    }
}

impl Default for ParameterRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Default record of type `name` from the builtin registry
pub fn create_feature_parameters(name: &str) -> DetectResult<Box<dyn FeatureParameters>> {
    ParameterRegistry::builtin().create(name)
}

/// Record from a single-key `{name: body}` node, resolved through the builtin registry
#[cfg(feature = "serde")]
pub fn load_parameters(node: &Value) -> DetectResult<Box<dyn FeatureParameters>> {
    ParameterRegistry::builtin().load(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use aif_core::DistanceMetric;

    #[test]
    fn test_child_count_rules() {
        assert!(AifParameters::new().create_feature().unwrap().is_none());

        let one = AifParameters::new().with(OrbParameters::defaults());
        let backend = one.create_feature().unwrap().unwrap();
        assert_eq!(backend.name(), "AffineInvariantFeature");
        assert_eq!(backend.distance_metric(), DistanceMetric::Hamming);
        assert_eq!(one.create_base().unwrap().unwrap().name(), "ORB");

        let two = AifParameters::new()
            .with(OrbParameters::defaults())
            .with(OrbParameters::defaults().threshold(40));
        assert_eq!(two.create_base().unwrap().unwrap().name(), "ORB+ORB");

        let three = two.with(OrbParameters::defaults());
        assert!(matches!(three.create_base(), Err(DetectError::TooManyBackends(3))));
    }

    #[test]
    fn test_mixed_metrics_cannot_combine() {
        let params = AifParameters::new()
            .with(OrbParameters::defaults())
            .with(PatchParameters::defaults());
        assert!(matches!(
            params.create_base(),
            Err(DetectError::IncompatibleBackends { .. })
        ));
    }

    #[test]
    fn test_invalid_child_is_reported() {
        let params = AifParameters::new().with(OrbParameters::defaults().threshold(0));
        assert!(matches!(
            params.create_feature(),
            Err(DetectError::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_registry_names() {
        let registry = ParameterRegistry::builtin();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["AIFParameters", "OrbParameters", "PatchParameters"]);
        assert_eq!(
            create_feature_parameters("PatchParameters").unwrap().default_name(),
            "PatchParameters"
        );
        assert!(matches!(
            create_feature_parameters("SIFTParameters"),
            Err(DetectError::UnknownParameters(_))
        ));
    }

    #[cfg(feature = "serde")]
    mod documents {
        use super::*;

        fn sample_tree() -> AifParameters {
            AifParameters::new()
                .with(OrbParameters::defaults().threshold(25).max_features(120))
                .with(OrbParameters::defaults().patch_size(15))
        }

        #[test]
        fn test_json_round_trip() {
            let json = sample_tree().to_json().unwrap();
            assert!(json.contains("\"AIFParameters\""));
            let loaded = AifParameters::from_json(&json).unwrap();
            assert_eq!(loaded.len(), 2);
            assert_eq!(loaded.to_document().unwrap(), sample_tree().to_document().unwrap());
        }

        #[test]
        fn test_toml_round_trip() {
            let text = sample_tree().to_toml().unwrap();
            let loaded = AifParameters::from_toml(&text).unwrap();
            assert_eq!(loaded.to_document().unwrap(), sample_tree().to_document().unwrap());
        }

        #[test]
        fn test_partial_record_uses_defaults() {
            let doc = serde_json::json!({"AIFParameters": [{"PatchParameters": {"grid_size": 4}}]});
            let loaded = AifParameters::from_document(&doc).unwrap();
            let backend = loaded.create_base().unwrap().unwrap();
            assert_eq!(backend.name(), "Patch");
            assert_eq!(backend.distance_metric(), DistanceMetric::L2);
        }

        #[test]
        fn test_unknown_names_are_errors() {
            let doc = serde_json::json!({"AIFParameters": [{"SURFParameters": {}}]});
            assert!(matches!(
                AifParameters::from_document(&doc),
                Err(DetectError::UnknownParameters(name)) if name == "SURFParameters"
            ));
            let doc = serde_json::json!({"OrbParameters": {}});
            assert!(AifParameters::from_document(&doc).is_err());
            assert!(load_parameters(&doc).is_ok());
        }

        #[test]
        fn test_invalid_loaded_values_are_rejected() {
            let doc = serde_json::json!({"OrbParameters": {"arc_length": 20}});
            assert!(matches!(
                load_parameters(&doc),
                Err(DetectError::InvalidParameters(_))
            ));
        }
    }
}
