//! Search command handler.

use anyhow::{Context, bail};
use vectorvault::{MetadataScalar, SearchOptions, SearchResponse, StoreConfig};

use super::{close_store, open_store};

/// Search command.
pub async fn cmd_search(
    config: &StoreConfig,
    vector: &str,
    top_k: usize,
    threshold: f32,
    filters: &[String],
    json: bool,
) -> anyhow::Result<()> {
    let query = parse_vector(vector)?;
    let mut options = SearchOptions::new()
        .with_top_k(top_k)
        .with_score_threshold(threshold);
    for filter in filters {
        let (field, value) = parse_filter(filter)?;
        options = options.with_filter(field, [value]);
    }

    let store = open_store(config).await?;
    let response = store.search(&query, &options).await;
    close_store(store).await?;
    let response = response?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response_json(&response))?);
        return Ok(());
    }

    println!(
        "Found {} matches ({} shown) in {:.2}ms",
        response.total_found,
        response.results.len(),
        response.query_time.as_secs_f64() * 1000.0
    );
    for (rank, result) in response.results.iter().enumerate() {
        println!();
        println!("{}. {} (score: {:.4})", rank + 1, result.id, result.score);
        if let Some(document_id) = result.metadata.document_id() {
            println!("   document: {document_id}");
        }
        println!("   {}", preview(&result.content, 120));
    }
    Ok(())
}

/// Parses `0.1,0.2,-0.3` into an embedding.
fn parse_vector(raw: &str) -> anyhow::Result<Vec<f32>> {
    let values = raw
        .trim()
        .trim_start_matches('[')
        .trim_end_matches(']')
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f32>()
                .with_context(|| format!("invalid vector component '{part}'"))
        })
        .collect::<anyhow::Result<Vec<f32>>>()?;

    if values.is_empty() {
        bail!("query vector must not be empty");
    }
    Ok(values)
}

/// Parses `field=value`; `true`/`false` and integers become typed scalars.
fn parse_filter(raw: &str) -> anyhow::Result<(String, MetadataScalar)> {
    let Some((field, value)) = raw.split_once('=') else {
        bail!("filter '{raw}' must have the form field=value");
    };
    let field = field.trim();
    if field.is_empty() {
        bail!("filter '{raw}' has an empty field name");
    }

    let value = value.trim();
    let scalar = match value {
        "true" => MetadataScalar::Bool(true),
        "false" => MetadataScalar::Bool(false),
        _ => value.parse::<i64>().map_or_else(
            |_| MetadataScalar::Text(value.to_string()),
            MetadataScalar::Integer,
        ),
    };
    Ok((field.to_string(), scalar))
}

fn response_json(response: &SearchResponse) -> serde_json::Value {
    let results: Vec<serde_json::Value> = response
        .results
        .iter()
        .map(|result| {
            serde_json::json!({
                "id": result.id,
                "score": result.score,
                "content": result.content,
                "metadata": result.metadata.to_json(),
            })
        })
        .collect();
    serde_json::json!({
        "totalFound": response.total_found,
        "queryTimeMs": response.query_time.as_secs_f64() * 1000.0,
        "results": results,
    })
}

fn preview(content: &str, max_chars: usize) -> String {
    let single_line = content.replace('\n', " ");
    if single_line.chars().count() <= max_chars {
        return single_line;
    }
    let truncated: String = single_line.chars().take(max_chars).collect();
    format!("{truncated}...")
}
