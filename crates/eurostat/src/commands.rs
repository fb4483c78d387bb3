use std::io::Write;

use clap::{Args, Subcommand};
use eurostat_core::catalog::CatalogProvider;
use eurostat_core::catalog::structure::RemoteCatalogProvider;
use eurostat_core::config::EurostatConfig;
use eurostat_core::dataflow::list_dataflows;
use eurostat_core::endpoint::list_endpoints;
use eurostat_core::geo::{GeoLevel, classify_geo_code, country_name};
use eurostat_core::projections::Projections;
use eurostat_core::scan::{PollPull, bind_scan};
use eurostat_error::Result;
use eurostat_http::client::HttpClient;
use tracing::{debug, warn};

use crate::filter::{build_predicate, row_matches};
use crate::output::{or_empty, write_row};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the known data providers.
    Endpoints,
    /// List dataflow (dataset) metadata.
    Dataflows(DataflowsArgs),
    /// Show the dimensions of a dataset.
    Structure(StructureArgs),
    /// Read observations from a dataset.
    Read(ReadArgs),
    /// Classify geo codes by their NUTS level.
    GeoLevel(GeoLevelArgs),
    /// Show all settings with their current values.
    Settings,
}

#[derive(Debug, Args)]
pub struct DataflowsArgs {
    /// Provider to list dataflows for. All providers if omitted.
    #[clap(long = "provider", value_name = "PROVIDER")]
    pub providers: Vec<String>,

    /// Dataflow to list. All dataflows if omitted.
    #[clap(long = "dataflow", value_name = "DATAFLOW")]
    pub dataflows: Vec<String>,

    /// Language of labels, defaults to the `language` setting.
    #[clap(long)]
    pub language: Option<String>,
}

#[derive(Debug, Args)]
pub struct StructureArgs {
    pub provider: String,
    pub dataset: String,

    /// Language of labels, defaults to the `language` setting.
    #[clap(long)]
    pub language: Option<String>,

    /// Include the values present for each dimension.
    #[clap(long)]
    pub values: bool,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    pub provider: String,
    pub dataset: String,

    /// Filter expression, e.g. `geo=AL`, `geo=AL,DE`, `time_period=2000..2010`
    /// or `time_period>=2000`.
    ///
    /// May be given multiple times, filters are AND-ed unless `--any` is set.
    #[clap(long = "filter", value_name = "EXPR")]
    pub filters: Vec<String>,

    /// Match rows satisfying any filter instead of all of them.
    #[clap(long)]
    pub any: bool,

    /// Columns to output, comma separated. All columns if omitted.
    #[clap(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Max number of rows to output.
    #[clap(long)]
    pub limit: Option<usize>,
}

#[derive(Debug, Args)]
pub struct GeoLevelArgs {
    /// Geo codes to classify.
    #[clap(required = true)]
    pub codes: Vec<String>,
}

impl Commands {
    pub async fn run<C, W>(self, config: &EurostatConfig, client: &C, out: &mut W) -> Result<()>
    where
        C: HttpClient,
        W: Write,
    {
        match self {
            Commands::Endpoints => endpoints(out),
            Commands::Dataflows(args) => dataflows(args, config, client, out).await,
            Commands::Structure(args) => structure(args, config, client, out).await,
            Commands::Read(args) => read(args, config, client, out).await,
            Commands::GeoLevel(args) => geo_level(args, out),
            Commands::Settings => settings(config, out),
        }
    }
}

fn endpoints<W: Write>(out: &mut W) -> Result<()> {
    write_row(out, ["provider_id", "organization", "description", "api_url"])?;
    for endpoint in list_endpoints() {
        write_row(
            out,
            [
                endpoint.provider_id,
                endpoint.organization,
                endpoint.description,
                endpoint.api_url,
            ],
        )?;
    }
    Ok(())
}

async fn dataflows<C: HttpClient, W: Write>(
    args: DataflowsArgs,
    config: &EurostatConfig,
    client: &C,
    out: &mut W,
) -> Result<()> {
    let language = args.language.as_deref().unwrap_or(&config.language);
    let infos = list_dataflows(client, &args.providers, &args.dataflows, language).await?;

    write_row(
        out,
        [
            "provider_id",
            "dataflow_id",
            "class",
            "version",
            "label",
            "language",
            "number_of_values",
            "data_start",
            "data_end",
            "update_data",
            "update_structure",
        ],
    )?;
    for info in infos {
        write_row(
            out,
            [
                info.provider_id,
                info.dataflow_id,
                info.class,
                info.version,
                info.label,
                info.language,
                or_empty(info.number_of_values),
                or_empty(info.data_start),
                or_empty(info.data_end),
                or_empty(info.update_data.map(|d| d.to_rfc3339())),
                or_empty(info.update_structure.map(|d| d.to_rfc3339())),
            ],
        )?;
    }
    Ok(())
}

async fn structure<C: HttpClient, W: Write>(
    args: StructureArgs,
    config: &EurostatConfig,
    client: &C,
    out: &mut W,
) -> Result<()> {
    let language = args.language.unwrap_or_else(|| config.language.clone());
    let catalogs = RemoteCatalogProvider::new(client.clone(), language).with_values(args.values);
    let catalog = catalogs
        .lookup_catalog(&args.provider, &args.dataset)
        .await?;

    write_row(out, ["index", "position", "name", "label", "values"])?;
    for (idx, dim) in catalog.dimensions().iter().enumerate() {
        write_row(
            out,
            [
                idx.to_string(),
                or_empty(dim.position()),
                dim.name.clone(),
                dim.label.clone(),
                dim.values.join(","),
            ],
        )?;
    }
    Ok(())
}

async fn read<C: HttpClient, W: Write>(
    args: ReadArgs,
    config: &EurostatConfig,
    client: &C,
    out: &mut W,
) -> Result<()> {
    let predicate = build_predicate(&args.filters, args.any)?;

    let catalogs = RemoteCatalogProvider::new(client.clone(), config.language.clone());
    let bind = bind_scan(&catalogs, &args.provider, &args.dataset).await?;
    let schema = bind.schema();

    let projections = if args.columns.is_empty() {
        Projections::all()
    } else {
        let names: Vec<_> = args.columns.iter().map(|c| c.trim().to_lowercase()).collect();
        Projections::from_names(schema, &names)?
    };
    let output_columns = projections.indices(schema)?;

    // Scan every column, the predicate may reference columns that aren't
    // part of the output.
    let op = bind.create_operator_state(predicate.as_ref(), &Projections::all())?;
    if predicate.is_some() && !op.filters_pushed_down() {
        warn!("filters could not be pushed down, reading the full dataset");
    }

    let mut partition = op.create_partition_state(client, config).await?;
    debug!(rows = partition.cardinality(), "fetched observations");

    write_row(out, output_columns.iter().map(|&idx| &schema.fields[idx].name))?;

    let limit = args.limit.unwrap_or(usize::MAX);
    let mut written = 0;
    let mut batch = op.create_batch(config.batch_size as usize);

    while written < limit {
        let poll = partition.poll_pull(&mut batch)?;

        for row in 0..batch.num_rows() {
            if written >= limit {
                break;
            }
            if let Some(predicate) = &predicate {
                if !row_matches(predicate, schema, &batch, row) {
                    continue;
                }
            }
            write_row(
                out,
                output_columns
                    .iter()
                    .map(|&idx| or_empty(batch.arrays()[idx].format_value(row))),
            )?;
            written += 1;
        }

        if poll == PollPull::Exhausted {
            break;
        }
    }

    debug!(written, "wrote rows");

    Ok(())
}

fn geo_level<W: Write>(args: GeoLevelArgs, out: &mut W) -> Result<()> {
    write_row(out, ["code", "level", "country"])?;
    for code in args.codes {
        let level = classify_geo_code(&code);
        let country = match level {
            GeoLevel::Aggregate | GeoLevel::Unknown => None,
            _ => code.get(0..2).and_then(country_name),
        };
        write_row(
            out,
            [code.as_str(), level.as_str(), country.unwrap_or_default()],
        )?;
    }
    Ok(())
}

fn settings<W: Write>(config: &EurostatConfig, out: &mut W) -> Result<()> {
    write_row(out, ["name", "value", "description"])?;
    for (name, description, value) in config.settings() {
        write_row(out, [name, value.as_str(), description])?;
    }
    Ok(())
}
