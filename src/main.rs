use quizgrid::engine::{Engine, EngineError};
use quizgrid::query::QueryParams;
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        usage(&args[0]);
        process::exit(1);
    }

    let data_dir = &args[1];
    let engine = Engine::new(data_dir);

    if args.get(2).map(String::as_str) == Some("--list") || args.len() == 2 {
        match engine.datasets() {
            Ok(ids) => {
                for id in ids {
                    println!("{}\t{}", id, display_title(&id));
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            }
        }
        return;
    }

    let dataset = &args[2];
    let mut params = QueryParams::default();
    let mut sort = false;

    let mut i = 3;
    while i < args.len() {
        match args[i].as_str() {
            "-l" | "--level" => {
                i += 1;
                if i < args.len() {
                    params.level = args[i].parse().unwrap_or_else(|_| {
                        eprintln!("Invalid level: {}", args[i]);
                        process::exit(1);
                    });
                }
            }
            "-p" | "--parent" => {
                i += 1;
                if i < args.len() {
                    params.include_parents.push(args[i].clone());
                }
            }
            "-x" | "--exclude-parent" => {
                i += 1;
                if i < args.len() {
                    params.exclude_parents.push(args[i].clone());
                }
            }
            "-f" | "--filter" => {
                i += 1;
                if i < args.len() {
                    match args[i].split_once('=') {
                        Some((column, value)) => params
                            .column_filters
                            .push((column.to_string(), value.to_string())),
                        None => {
                            eprintln!("Invalid filter (expected column=value): {}", args[i]);
                            process::exit(1);
                        }
                    }
                }
            }
            "-s" | "--sort" => {
                sort = true;
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let output = match engine.query(dataset, &params) {
        Ok(output) => output,
        Err(e @ EngineError::NotFound { .. }) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut table = output.table.clone();
    if sort {
        let name_col = table.column_index("name").unwrap_or(0);
        table
            .rows
            .sort_by_key(|row| row[name_col].to_string().to_lowercase());
    }

    print!("{}", table.to_tsv());
    if let Some(options) = &output.top_level_options {
        eprintln!("Categories: {}", options.join(", "));
    }
}

fn usage(program: &str) {
    eprintln!("Usage: {} <data-dir> [<dataset>] [options]", program);
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --list                      List available datasets");
    eprintln!("  -l, --level <n>             Max ancestor depth for --parent (default: 1)");
    eprintln!("  -p, --parent <name>         Include descendants of a parent (repeatable)");
    eprintln!("  -x, --exclude-parent <name> Exclude descendants of a parent (repeatable)");
    eprintln!("  -f, --filter <col=value>    Exact-match column filter (repeatable)");
    eprintln!("  -s, --sort                  Sort rows alphabetically by name");
}

/// Human-readable title for a dataset id: hyphens to spaces, title case.
fn display_title(dataset: &str) -> String {
    dataset
        .split('-')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
