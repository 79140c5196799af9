//! Freightline probe
//!
//! Compiles a list query for one entity and either prints the document or
//! runs it against the configured GraphQL endpoint.

mod cli;

use anyhow::{Context, Result};
use serde_json::Value as JsonValue;

use freightline::config::Config;
use freightline::graphql::entities;
use freightline::graphql::filters::FilterSpec;
use freightline::graphql::orm::{Repository, bind, compile_list};
use freightline::services::client::HttpTransport;
use freightline::services::logging;

use crate::cli::CliOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let options = CliOptions::from_args()?;
    let config = Config::from_env()?;
    logging::init(config.log_format);

    let schema = entities::lookup(&options.entity)
        .with_context(|| format!("Unknown entity {:?}", options.entity))?;

    let mut spec = FilterSpec::new();
    if let Some(keywords) = &options.keywords {
        spec = spec.keywords(keywords.as_str());
    }
    spec.pagination.page = options.page;
    spec.pagination.page_size = options.page_size;

    let compile_options = config.compile_options();
    if options.print_query {
        let compiled = compile_list(schema, &spec, &compile_options);
        println!("{}", compiled.document);
        println!(
            "{}",
            serde_json::to_string_pretty(&JsonValue::Object(bind(&compiled, &compile_options)))?
        );
        return Ok(());
    }

    let transport = HttpTransport::new(
        config.require_graphql_url()?,
        config.api_token.clone(),
        config.request_timeout,
    )?;
    tracing::info!(entity = schema.plural, endpoint = transport.endpoint(), "Running list query");

    let repository =
        Repository::new(&transport, schema, compile_options).with_actor(config.user_id);
    let result = repository
        .list::<JsonValue>(&spec)
        .await
        .with_context(|| format!("Listing {} failed", schema.plural))?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
