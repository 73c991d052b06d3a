//! Command-line interface for the template engine and reference scanner

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use log::{info, warn};
use xtemplate_core::{
    build_code_from_template, find_templates_in_project, persist,
    persist::{JsonFileStore, SettingsStore},
    pattern_for_identity, AssetIdentity, CancellationToken, DirFileSystem, LineEndings,
    QuerySettings, ReferenceQuery, TabMode, TemplateDocument, TemplateSettings,
};

#[derive(Parser)]
#[command(name = "xtemplate")]
#[command(about = "XML template rendering and asset reference search")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable quiet mode (suppress non-error output)
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Preferences file for saved settings
    #[arg(long, global = true, default_value = "xtemplate-prefs.json")]
    prefs: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LineEndingsArg {
    Unix,
    Windows,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum TabsArg {
    Tabs,
    Spaces,
}

#[derive(Subcommand)]
enum Commands {
    /// List templates found under a directory
    List {
        /// Directory to scan for templates
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Render a template to a source file
    Build {
        /// Path of the template file
        template: PathBuf,
        /// Build option value, as id=value
        #[arg(short = 'O', long = "option", value_name = "ID=VALUE")]
        options: Vec<String>,
        /// Enable an optional using directive
        #[arg(long, value_name = "ID")]
        using: Vec<String>,
        /// Disable an optional using directive
        #[arg(long, value_name = "ID")]
        no_using: Vec<String>,
        /// Add a using directive the template does not declare
        #[arg(long, value_name = "ID")]
        custom_using: Vec<String>,
        /// Line-ending style of the output
        #[arg(long, value_enum)]
        line_endings: Option<LineEndingsArg>,
        /// Indentation style of the output
        #[arg(long, value_enum)]
        tabs: Option<TabsArg>,
        /// Emit rich-text color tags around keywords
        #[arg(long)]
        highlight: bool,
        /// Output file (defaults to the template's suggested file name);
        /// `-` writes to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite the output file if it exists
        #[arg(long)]
        force: bool,
        /// Remember the chosen options and usings for this template
        #[arg(long)]
        save: bool,
    },
    /// Find files referencing an asset
    Find {
        /// Asset guid to search for
        guid: String,
        /// File id of a sub-asset; searches the whole asset when omitted
        #[arg(long)]
        file_id: Option<i64>,
        /// Directory the scan starts from
        #[arg(long)]
        root: Option<String>,
        /// File extension to scan, with the leading dot; repeatable,
        /// replaces the saved extension list
        #[arg(short, long, value_name = "EXT")]
        extension: Vec<String>,
    },
    /// Rewrite references from one asset to another
    Replace {
        /// Guid the references currently point at
        old_guid: String,
        /// Guid the references should point at
        new_guid: String,
        /// Directory the scan starts from
        #[arg(long)]
        root: Option<String>,
        /// File extension to scan, with the leading dot; repeatable,
        /// replaces the saved extension list
        #[arg(short, long, value_name = "EXT")]
        extension: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let mut store = JsonFileStore::open(&cli.prefs);

    match cli.command {
        Commands::List { root } => handle_list(&root),
        Commands::Build {
            template,
            options,
            using,
            no_using,
            custom_using,
            line_endings,
            tabs,
            highlight,
            output,
            force,
            save,
        } => handle_build(
            &mut store,
            BuildArgs {
                template,
                options,
                using,
                no_using,
                custom_using,
                line_endings,
                tabs,
                highlight,
                output,
                force,
                save,
            },
        ),
        Commands::Find {
            guid,
            file_id,
            root,
            extension,
        } => handle_find(&store, guid, file_id, root, extension),
        Commands::Replace {
            old_guid,
            new_guid,
            root,
            extension,
        } => handle_replace(&mut store, old_guid, new_guid, root, extension),
    }
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();
}

fn handle_list(root: &Path) -> anyhow::Result<()> {
    let templates = find_templates_in_project(root);

    if templates.is_empty() {
        println!("no templates found under {}", root.display());
        return Ok(());
    }

    for template in &templates {
        let path = template
            .source_path
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_default();
        let status = if template.is_malformed {
            format!(" (unsupported format {})", template.format)
        } else {
            String::new()
        };
        println!(
            "{:<24} priority {:>3}  {}{}",
            template.id, template.priority, path, status
        );
    }
    Ok(())
}

struct BuildArgs {
    template: PathBuf,
    options: Vec<String>,
    using: Vec<String>,
    no_using: Vec<String>,
    custom_using: Vec<String>,
    line_endings: Option<LineEndingsArg>,
    tabs: Option<TabsArg>,
    highlight: bool,
    output: Option<PathBuf>,
    force: bool,
    save: bool,
}

fn handle_build<S: SettingsStore>(store: &mut S, args: BuildArgs) -> anyhow::Result<()> {
    let template = TemplateDocument::from_file(&args.template)
        .with_context(|| format!("failed to load template {}", args.template.display()))?;

    let mut settings = TemplateSettings::for_template(&template);
    persist::restore_formatting(store, "default", &mut settings);
    persist::restore_template_choices(store, "default", &template, &mut settings);

    for entry in &args.options {
        let (id, value) = entry
            .split_once('=')
            .with_context(|| format!("invalid option '{}', expected id=value", entry))?;
        if !settings.set_build_option(id, value) {
            warn!("template does not declare build option '{}'", id);
        }
    }

    for id in &args.using {
        if !settings.set_optional_using(id, true) {
            warn!("template does not declare optional using '{}'", id);
        }
    }
    for id in &args.no_using {
        if !settings.set_optional_using(id, false) {
            warn!("template does not declare optional using '{}'", id);
        }
    }
    for id in &args.custom_using {
        settings.add_custom_using(id);
    }

    if let Some(style) = args.line_endings {
        settings.line_endings = match style {
            LineEndingsArg::Unix => LineEndings::Unix,
            LineEndingsArg::Windows => LineEndings::Windows,
        };
    }
    if let Some(style) = args.tabs {
        settings.tab_mode = match style {
            TabsArg::Tabs => TabMode::Tabs,
            TabsArg::Spaces => TabMode::Spaces,
        };
    }
    settings.enable_syntax_highlighting = args.highlight;

    let unmet = settings.unmet_required_options();
    if !unmet.is_empty() {
        bail!("required build options not set: {}", unmet.join(", "));
    }

    let code = build_code_from_template(&template, &settings)?;

    if args.save {
        persist::save_formatting(store, "default", &settings);
        persist::save_template_choices(store, "default", &template, &settings)?;
    }

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(template.suggested_file_name(&settings)));

    if output.as_os_str() == "-" {
        println!("{}", code);
        return Ok(());
    }

    if output.exists() && !args.force {
        bail!(
            "output file {} already exists (use --force to overwrite)",
            output.display()
        );
    }

    std::fs::write(&output, &code)
        .with_context(|| format!("failed to write {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(())
}

fn query_settings<S: SettingsStore>(
    store: &S,
    root: Option<String>,
    extensions: Vec<String>,
) -> QuerySettings {
    let mut settings = persist::restore_query_settings(store);
    if let Some(root) = root {
        settings.root_folder = root;
    }
    if !extensions.is_empty() {
        settings.extensions = extensions;
    }
    settings
}

fn handle_find<S: SettingsStore>(
    store: &S,
    guid: String,
    file_id: Option<i64>,
    root: Option<String>,
    extensions: Vec<String>,
) -> anyhow::Result<()> {
    let settings = query_settings(store, root, extensions);
    let identity = match file_id {
        Some(file_id) => AssetIdentity::Sub { file_id, guid },
        None => AssetIdentity::Main { guid },
    };
    let pattern = pattern_for_identity(&identity);

    let mut query = ReferenceQuery::new(settings);
    query.find_references(&DirFileSystem, &pattern, &CancellationToken::new())?;

    if query.referencing_paths.is_empty() {
        println!("no references found");
        return Ok(());
    }
    for path in &query.referencing_paths {
        println!("{}", path.display());
    }
    Ok(())
}

fn handle_replace<S: SettingsStore>(
    store: &mut S,
    old_guid: String,
    new_guid: String,
    root: Option<String>,
    extensions: Vec<String>,
) -> anyhow::Result<()> {
    let settings = query_settings(store, root, extensions);
    if !settings.allow_replace {
        bail!("replacement is disabled in the saved query settings");
    }

    let pattern = pattern_for_identity(&AssetIdentity::Main { guid: old_guid });
    let replacement = pattern_for_identity(&AssetIdentity::Main { guid: new_guid });

    let mut query = ReferenceQuery::new(settings);
    query.find_references(&DirFileSystem, &pattern, &CancellationToken::new())?;
    let candidates = query.referencing_paths.len();
    let rewritten =
        query.replace_references(&DirFileSystem, &pattern, &replacement, &CancellationToken::new())?;

    println!("rewrote {} of {} referencing files", rewritten, candidates);
    Ok(())
}
