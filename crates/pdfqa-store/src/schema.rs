use arrow_schema::{DataType, Field, Schema, TimeUnit};
use std::sync::Arc;

pub fn build_documents_schema() -> Arc<Schema> {
	Arc::new(Schema::new(vec![
		Field::new("id", DataType::Utf8, false),
		Field::new("raw_text", DataType::Utf8, false),
		Field::new("chunks", DataType::List(Arc::new(Field::new("item", DataType::Utf8, true))), false),
		Field::new("ingested_at", DataType::Timestamp(TimeUnit::Millisecond, None), false),
	]))
}
