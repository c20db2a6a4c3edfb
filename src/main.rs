use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reactive_compiler::{compile, CompileOptions};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const COMPONENT_EXTENSION: &str = "svelte";

#[derive(Parser)]
#[command(name = "reactive-compiler", version, about = "Reactive component compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a component, or every component under a directory, into ES modules.
    Compile {
        /// Path to a .svelte file or a directory of them
        input: PathBuf,
        /// Output directory (default: next to each input)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Log every compiled file and written artifact
        #[arg(long)]
        verbose: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Compile {
            input,
            out_dir,
            verbose,
        } => compile_cmd(&input, out_dir.as_deref(), verbose)?,
    }
    Ok(())
}

fn compile_cmd(input: &Path, out_dir: Option<&Path>, verbose: bool) -> Result<()> {
    let options = CompileOptions::default();

    if input.is_dir() {
        let files = find_components(input);
        if verbose {
            eprintln!(
                "[compiler] {} component(s) under {}",
                files.len(),
                input.display()
            );
        }
        for file in files {
            // Keep the source tree layout under --out-dir.
            let target_dir = out_dir.map(|dir| {
                let relative = file
                    .parent()
                    .and_then(|parent| parent.strip_prefix(input).ok())
                    .unwrap_or_else(|| Path::new(""));
                dir.join(relative)
            });
            compile_file(&file, target_dir.as_deref(), &options, verbose)?;
        }
        Ok(())
    } else {
        compile_file(input, out_dir, &options, verbose)
    }
}

fn compile_file(
    input: &Path,
    out_dir: Option<&Path>,
    options: &CompileOptions,
    verbose: bool,
) -> Result<()> {
    let source =
        fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))?;

    let result = match compile(&source, options) {
        Ok(result) => result,
        Err(error) => {
            eprintln!("[compiler] {}: {}", input.display(), error);
            return Err(anyhow::anyhow!(error))
                .with_context(|| format!("failed to compile {}", input.display()));
        }
    };
    if verbose {
        eprintln!(
            "[compiler] compiled {} (reactive: {})",
            input.display(),
            result.analysis.will_change.join(", ")
        );
    }

    let artifacts = ArtifactPaths::for_input(input, out_dir);
    fs::create_dir_all(&artifacts.dir)
        .with_context(|| format!("failed to create {}", artifacts.dir.display()))?;

    write_artifact(&artifacts.js, &result.js, verbose)?;
    if let Some(css) = &result.css {
        write_artifact(&artifacts.css, css, verbose)?;
    }
    write_artifact(&artifacts.ast_json, &result.ast_json, verbose)?;
    Ok(())
}

fn write_artifact(path: &Path, contents: &str, verbose: bool) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    if verbose {
        eprintln!("[compiler] wrote {}", path.display());
    }
    Ok(())
}

fn find_components(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext == COMPONENT_EXTENSION)
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

#[derive(Debug, PartialEq, Eq)]
struct ArtifactPaths {
    dir: PathBuf,
    js: PathBuf,
    css: PathBuf,
    ast_json: PathBuf,
}

impl ArtifactPaths {
    fn for_input(input: &Path, out_dir: Option<&Path>) -> Self {
        let name = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("component");
        let dir = out_dir
            .map(Path::to_path_buf)
            .or_else(|| input.parent().map(Path::to_path_buf))
            .unwrap_or_default();

        ArtifactPaths {
            js: dir.join(format!("{}.js", name)),
            css: dir.join(format!("{}.css", name)),
            ast_json: dir.join(format!("{}.ast.json", name)),
            dir,
        }
    }
}
