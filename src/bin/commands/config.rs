use clap::Args;
use opacidb::config::{
    format_size, get_document_info, get_sqlite_info, DocumentInfo, SqliteDatabaseInfo,
};
use opacidb::lens::utils::OutputFormat;
use opacidb::OpacidbConfig;
use serde::Serialize;

/// Arguments for the Config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Show detailed information about all data files
    #[clap(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Serialize)]
struct ConfigInfo {
    config_file: String,
    data_dir: String,
    distance_metric: String,
    database: SqliteDatabaseInfo,
    document: DocumentInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    files: Option<Vec<FileInfo>>,
}

#[derive(Debug, Serialize)]
struct FileInfo {
    name: String,
    path: String,
    size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    modified: Option<String>,
}

pub fn run(config: &OpacidbConfig, args: ConfigArgs, output_format: OutputFormat) {
    let ConfigArgs { verbose } = args;

    let files = if verbose {
        let mut file_list = Vec::new();

        if let Ok(entries) = std::fs::read_dir(&config.data_dir) {
            for entry in entries.flatten() {
                if let Ok(metadata) = entry.metadata() {
                    if metadata.is_file() {
                        let modified = metadata.modified().ok().map(|t| {
                            let datetime: chrono::DateTime<chrono::Utc> = t.into();
                            datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string()
                        });

                        file_list.push(FileInfo {
                            name: entry.file_name().to_string_lossy().to_string(),
                            path: entry.path().to_string_lossy().to_string(),
                            size_bytes: metadata.len(),
                            modified,
                        });
                    }
                }
            }
        }

        file_list.sort_by(|a, b| a.name.cmp(&b.name));
        Some(file_list)
    } else {
        None
    };

    let config_info = ConfigInfo {
        config_file: OpacidbConfig::config_file_path(),
        data_dir: config.data_dir.clone(),
        distance_metric: config.distance_metric.to_string(),
        database: get_sqlite_info(config),
        document: get_document_info(config),
        files,
    };

    match output_format {
        OutputFormat::Json | OutputFormat::JsonLine => match serde_json::to_string(&config_info) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing config info: {}", e),
        },
        OutputFormat::JsonPretty => match serde_json::to_string_pretty(&config_info) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing config info: {}", e),
        },
        _ => {
            // Table, Markdown, and PSV all use the same human-readable format
            print_config_table(&config_info, verbose);
        }
    }
}

fn print_config_table(info: &ConfigInfo, verbose: bool) {
    println!("opacidb Configuration");
    println!("=====================\n");

    println!("General:");
    println!("  Config file:    {}", info.config_file);
    println!("  Data dir:       {}", info.data_dir);
    println!("  Metric:         {}", info.distance_metric);
    println!();

    let db = &info.database;
    println!("Relational Database:");
    println!("  Path:           {}", db.path);
    println!(
        "  Status:         {}",
        if db.exists { "exists" } else { "not created" }
    );
    if let Some(size) = db.size_bytes {
        println!("  Size:           {}", format_size(size));
    }
    if let Some(status) = &db.schema_status {
        println!(
            "  Schema:         {} (v{})",
            status,
            db.schema_version.unwrap_or(0)
        );
    }
    if let Some(len) = db.grid_len {
        println!("  Grid:           {} wavenumber points", len);
    }
    if let Some(count) = db.continuum_count {
        println!("  Continuum:      {} curves", count);
    }
    if let Some(count) = db.molecular_count {
        println!("  Molecular:      {} curves", count);
    }
    println!();

    let doc = &info.document;
    println!("Hierarchical Document:");
    println!("  Path:           {}", doc.path);
    println!(
        "  Status:         {}",
        if doc.exists { "exists" } else { "not created" }
    );
    if let Some(size) = doc.size_bytes {
        println!("  Size:           {}", format_size(size));
    }
    if let Some(created) = &doc.created_at {
        println!("  Created:        {}", created);
    }
    if let Some(len) = doc.grid_len {
        println!("  Grid:           {} wavenumber points", len);
    }
    if let Some(count) = doc.continuum_count {
        println!("  Continuum:      {} curves", count);
    }
    if let Some(count) = doc.molecular_count {
        println!("  Molecular:      {} curves", count);
    }

    if verbose {
        if let Some(ref files) = info.files {
            println!();
            println!("Data Directory Files:");
            println!("  {:<40} {:>12}  {}", "Name", "Size", "Modified");
            println!("  {}", "-".repeat(80));
            for file in files {
                println!(
                    "  {:<40} {:>12}  {}",
                    file.name,
                    format_size(file.size_bytes),
                    file.modified.as_deref().unwrap_or("-")
                );
            }
        }
    }

    eprintln!();
    eprintln!("Tips:");
    eprintln!("  Use --verbose (-v) to see all files in the data directory");
    eprintln!("  Use --format json for machine-readable output");
    eprintln!("  Edit ~/.opacidb/opacidb.toml to customize settings");
}
