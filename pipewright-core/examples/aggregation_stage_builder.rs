use pipewright_core::expressions::{array_to_object, first, map_key_value, push, push_fields};
use pipewright_core::{include_index, init_from_env, log_info, PipelineError, StageBuilder};
use serde_json::json;

/// Paid orders with their products grouped by category.
fn products_by_category() -> Result<StageBuilder, PipelineError> {
    let mut builder = StageBuilder::new();
    builder
        .filter("status_filter", json!({"status": "paid"}))?
        .join("product_lookup", "product", "products", "ean", "products")?
        .unwind("unwind_products", "$products", [include_index("productIndex")])?
        .group(
            "category_id_group",
            json!({
                "_id": {"orderId": "$_id", "category": "$products.category"},
                "status": first("$status"),
                "products": push("$products"),
            }),
        )?
        .group(
            "products_by_category",
            json!({
                "_id": "$_id.orderId",
                "status": first("$status"),
                "productsByCategory": push_fields(vec![
                    json!("category"), json!("$_id.category"),
                    json!("products"), json!("$products"),
                ])?,
            }),
        )?
        .project(
            "final_project",
            json!({
                "_id": 1,
                "status": 1,
                "grouped_products": array_to_object(map_key_value(
                    "$productsByCategory",
                    "cat",
                    "$$cat.category",
                    "$$cat.products",
                )),
            }),
        )?;

    // Skip orders whose lookup came back empty
    builder.append_stage("status_filter", json!({"products": {"$ne": []}}))?;
    Ok(builder)
}

fn main() {
    init_from_env();

    let builder = match products_by_category() {
        Ok(builder) => builder,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let pipeline = builder.build();
    log_info!("built {} stages: {:?}", pipeline.len(), pipeline.operators());

    match serde_json::to_string_pretty(&pipeline) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
