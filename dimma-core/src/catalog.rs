//! Task-type catalogue: container images and shard combiners
//!
//! Both tables are keyed on the free-form task-type tag. Unknown types fall
//! back to the default image, and to the default combiner that returns the
//! per-shard results as a JSON array in index order.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

/// Combines the per-shard results of a split task into one result value.
pub type ShardCombiner = Arc<dyn Fn(Vec<Value>) -> Value + Send + Sync>;

pub struct TaskCatalog {
    images: HashMap<String, String>,
    default_image: String,
    combiners: HashMap<String, ShardCombiner>,
}

impl Default for TaskCatalog {
    fn default() -> Self {
        let mut images = HashMap::new();
        images.insert(
            "image_processing".to_string(),
            "dimma/image-processing:latest".to_string(),
        );
        images.insert(
            "text_analysis".to_string(),
            "dimma/text-analysis:latest".to_string(),
        );
        images.insert(
            "ml_training".to_string(),
            "dimma/ml-training:latest".to_string(),
        );

        Self {
            images,
            default_image: "dimma/task-runner:latest".to_string(),
            combiners: HashMap::new(),
        }
    }
}

impl TaskCatalog {
    /// Image for a task type, falling back to the default image for
    /// unrecognised types.
    pub fn image_for(&self, task_type: &str) -> &str {
        self.images
            .get(task_type)
            .map(String::as_str)
            .unwrap_or(&self.default_image)
    }

    /// Extend the task-type → image table.
    pub fn register_image(&mut self, task_type: impl Into<String>, image: impl Into<String>) {
        self.images.insert(task_type.into(), image.into());
    }

    /// Register a type-aware combiner for split results.
    pub fn register_combiner(&mut self, task_type: impl Into<String>, combiner: ShardCombiner) {
        self.combiners.insert(task_type.into(), combiner);
    }

    /// Combine shard results in index order.
    pub fn combine(&self, task_type: &str, shards: Vec<Value>) -> Value {
        match self.combiners.get(task_type) {
            Some(combiner) => combiner(shards),
            None => Value::Array(shards),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_image_lookup_with_fallback() {
        let catalog = TaskCatalog::default();
        assert_eq!(
            catalog.image_for("image_processing"),
            "dimma/image-processing:latest"
        );
        assert_eq!(catalog.image_for("unknown_type"), "dimma/task-runner:latest");
    }

    #[test]
    fn test_register_image_extends_table() {
        let mut catalog = TaskCatalog::default();
        catalog.register_image("genome_alignment", "dimma/genome:latest");
        assert_eq!(catalog.image_for("genome_alignment"), "dimma/genome:latest");
    }

    #[test]
    fn test_default_combiner_returns_shards_unchanged() {
        let catalog = TaskCatalog::default();
        let combined = catalog.combine(
            "text_analysis",
            vec![json!({"a": 1}), json!({"b": 2})],
        );
        assert_eq!(combined, json!([{"a": 1}, {"b": 2}]));
    }

    #[test]
    fn test_registered_combiner_takes_precedence() {
        let mut catalog = TaskCatalog::default();
        catalog.register_combiner(
            "word_count",
            Arc::new(|shards| {
                let total: i64 = shards.iter().filter_map(|v| v.as_i64()).sum();
                Value::from(total)
            }),
        );
        let combined = catalog.combine("word_count", vec![json!(3), json!(4)]);
        assert_eq!(combined, json!(7));
    }
}
