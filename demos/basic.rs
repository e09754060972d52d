//! Basic example of partial validation

use partial_rs::prelude::*;
use serde_json::json;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Partial Validation Example ===\n");

    // Example 1: every kind of failure in one record
    println!("1. Missing and invalid fields become null:");

    let model = schema("Model")
        .field("a", string().required())
        .field("b", datetime().required())
        .field("c", int().required())
        .field("d", float().required())
        .field("e", boolean().required())
        .field("f", list().required())
        .field("g", list().required());

    let data = json!({
        "a": "this passes!",
        "b": false,
        "c": "foo",
        "d": null,
        "e": "2024-06-26T15:57:33.276163",
        "f": "TypeError",
    });

    match model.validate(&data) {
        Ok(result) => println!("{}", result.to_json(true)),
        Err(e) => println!("Rejected: {}", e),
    }

    // Example 2: lax coercion, then only the fields that passed
    println!("\n2. Valid values, fields set and the aggregate error:");

    let model = schema("Model")
        .field("a", datetime().required())
        .field("b", int().required())
        .field("c", boolean().required())
        .field("d", string().required());

    let data = json!({"a": "2024-06-27", "b": "satoshi", "c": "on"});

    match model.validate(&data) {
        Ok(result) => {
            println!("{}", serde_json::Value::Object(result.valid_values()));
            println!("{:?}", result.fields_set());
            if let Some(error) = result.to_error() {
                println!("{}", error);
            }
        }
        Err(e) => println!("Rejected: {}", e),
    }

    // Example 3: the same input under strict coercion
    println!("\n3. Strict mode:");

    match model.validate_with(&data, &ValidatorConfig::strict()) {
        Ok(result) => {
            for error in &result.errors {
                println!("  - {}", error);
            }
        }
        Err(e) => println!("Rejected: {}", e),
    }

    // Example 4: a top-level list is not a record
    println!("\n4. Non-object input:");

    match model.validate(&json!([1, 2, 3])) {
        Ok(_) => println!("Unexpected: validation passed"),
        Err(e) => println!("Expected error ({}): {}", e.kind(), e),
    }

    println!("\n=== All examples completed ===");
}
