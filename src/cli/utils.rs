use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format.
///
/// Object `data` is merged into the JSON response; anything else lands under `data`.
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = Map::new();
            response.insert("success".to_string(), json!(true));
            response.insert("message".to_string(), json!(message));
            match data {
                Some(Value::Object(fields)) => response.extend(fields),
                Some(other) => {
                    response.insert("data".to_string(), other);
                }
                None => {}
            }
            println!("{}", serde_json::to_string_pretty(&Value::Object(response))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    collection_name: []
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// One line per document: `_key` then a short label
pub fn document_line(document: &Value) -> String {
    let key = document.get("_key").and_then(Value::as_str).unwrap_or("-");
    let label = ["name", "scientific_name", "title", "email"]
        .iter()
        .find_map(|field| document.get(*field).and_then(Value::as_str))
        .unwrap_or("");
    if label.is_empty() {
        key.to_string()
    } else {
        format!("{}\t{}", key, label)
    }
}

/// Output a document list in the appropriate format
pub fn output_documents(output_format: &OutputFormat, collection_name: &str, documents: &[Value]) -> anyhow::Result<()> {
    if documents.is_empty() {
        return output_empty_collection(output_format, collection_name, &format!("No {} found", collection_name));
    }
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: documents }))?);
        }
        OutputFormat::Text => {
            for document in documents {
                println!("{}", document_line(document));
            }
        }
    }
    Ok(())
}
