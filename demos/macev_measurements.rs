use anyhow::Result;
use ddecoapi::{Client, Query};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Example program that calls the library API.
    // Configure the API key via env vars or a `.ddecoapirc` file.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ddecoapi=info")),
        )
        .init();

    let client = Client::from_env()?;

    // Macro-invertebrate measurements since April 2021, without object names.
    let measurements = Query::new("measurements")
        .with_filter(r#"measurementdate:ge:"2021-04-01";taxontype:eq:"MACEV""#)
        .with_skip_properties(["measurementobjectname"])
        .with_parse_watertypes(true);

    match client.fetch_table(&measurements) {
        Ok(table) => println!("measurements: {} rows, {} columns", table.len(), table.columns().len()),
        Err(e) if e.is_authentication() => {
            eprintln!("Invalid API key; the measurements endpoint needs one.");
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    }

    // The TWN taxon list is open and works without a key.
    let taxa = Query::new("parameters")
        .with_filter(r#"parametertype:eq:"TAXON";taxontype:eq:"MACEV""#);
    let table = client.fetch_table(&taxa)?;
    println!("MACEV taxa: {} rows", table.len());

    Ok(())
}
