use std::collections::HashSet;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::json;

use cfgdb::{
    CommitSummary, Configuration, DbConfig, ObjectRef, ObjectView, SchemaRegistry, Value,
    JSON_BACKEND,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let format = cli.format;
    match cli.command {
        Command::Create(args) => cmd_create(args, config, &format),
        Command::Includes(args) => cmd_includes(args, config, &format),
        Command::AddInclude(args) => cmd_edit_include(args, config, &format, true),
        Command::RemoveInclude(args) => cmd_edit_include(args, config, &format, false),
        Command::Objects(args) => cmd_objects(args, config, &format),
        Command::Show(args) => cmd_show(args, config, &format),
        Command::New(args) => cmd_new(args, config, &format),
        Command::Rm(args) => cmd_rm(args, config, &format),
        Command::Test(args) => cmd_test(args, config, &format),
        Command::Check(args) => cmd_check(args, config, &format),
        Command::Classes(args) => cmd_classes(args, config, &format),
        Command::Domains(args) => cmd_domains(args, &format),
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<DbConfig> {
    match &cli.config {
        Some(path) => Ok(DbConfig::from_toml_file(path)?.with_env_overrides()),
        None => Ok(DbConfig::from_env()),
    }
}

/// Accept both `jsonfile:<file>` and a bare data file path.
fn open(spec: &str, config: DbConfig) -> anyhow::Result<Configuration> {
    let spec = if spec.starts_with(JSON_BACKEND) {
        spec.to_string()
    } else {
        format!("{JSON_BACKEND}:{spec}")
    };
    Configuration::open_with(&spec, config).with_context(|| format!("cannot open {spec}"))
}

fn print_json(value: serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn report_commit(summary: &CommitSummary, format: &OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(serde_json::to_value(summary)?),
        OutputFormat::Text => {
            if summary.is_empty() {
                println!("Nothing to commit.");
                return Ok(());
            }
            println!("{} Committed \"{}\"", "✓".green().bold(), summary.comment);
            for file in &summary.files {
                println!("  {} {}", "wrote".green(), file.path.display());
            }
            Ok(())
        }
    }
}

fn object_json(object: &ObjectView<'_>) -> serde_json::Value {
    json!({
        "class": object.class(),
        "id": object.id(),
        "file": object.contained_in(),
        "fields": object.fields(),
    })
}

// ---------------------------------------------------------------------------
// Database and includes
// ---------------------------------------------------------------------------

fn cmd_create(args: CreateArgs, config: DbConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let includes: Vec<&str> = args.includes.iter().map(String::as_str).collect();
    let mut db = Configuration::open_with(JSON_BACKEND, config)?;
    if args.force {
        db.recreate_db(&args.db, &includes)?;
    } else {
        db.create_db(&args.db, &includes)?;
    }
    let summary = db.commit(&args.message)?;
    report_commit(&summary, format)
}

fn cmd_includes(args: IncludesArgs, config: DbConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let db = open(&args.spec, config)?;
    let includes = db.get_includes(args.file.as_deref())?;
    match format {
        OutputFormat::Json => print_json(json!(includes)),
        OutputFormat::Text => {
            if includes.is_empty() {
                println!("No includes.");
            }
            for include in includes {
                println!("{include}");
            }
            Ok(())
        }
    }
}

fn cmd_edit_include(
    args: IncludeEditArgs,
    config: DbConfig,
    format: &OutputFormat,
    add: bool,
) -> anyhow::Result<()> {
    let mut db = open(&args.spec, config)?;
    let verb = if add { "add" } else { "remove" };
    match (&args.file, add) {
        (Some(file), true) => db.add_include_to(file, &args.path)?,
        (Some(file), false) => db.remove_include_from(file, &args.path)?,
        (None, true) => db.add_include(&args.path)?,
        (None, false) => db.remove_include(&args.path)?,
    }
    let message = args
        .message
        .unwrap_or_else(|| format!("{verb} include {}", args.path));
    let summary = db.commit(&message)?;
    report_commit(&summary, format)
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

fn cmd_objects(args: ObjectsArgs, config: DbConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let db = open(&args.spec, config)?;
    let objects = db.get_objs(&args.class)?;
    match format {
        OutputFormat::Json => print_json(json!(objects
            .iter()
            .map(|o| json!({ "id": o.id(), "file": o.contained_in() }))
            .collect::<Vec<_>>())),
        OutputFormat::Text => {
            for object in &objects {
                println!("{}  {}", object.id().bold(), object.contained_in().display().to_string().dimmed());
            }
            println!("{} object(s) of class {}", objects.len(), args.class.cyan());
            Ok(())
        }
    }
}

fn cmd_show(args: ObjectArgs, config: DbConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let db = open(&args.spec, config)?;
    let object = db.get_obj(&args.class, &args.id)?;
    match format {
        OutputFormat::Json => print_json(object_json(&object)),
        OutputFormat::Text => {
            println!("{} ({})", object.full_name().yellow().bold(), object.contained_in().display());
            for (name, field) in object.fields() {
                let shown = match field {
                    cfgdb::Field::Attribute(value) => value.to_string(),
                    cfgdb::Field::Relation(relation) => {
                        let targets: Vec<String> =
                            relation.targets().iter().map(ObjectRef::full_name).collect();
                        format!("[{}]", targets.join(", "))
                    }
                };
                println!("  {name} = {shown}");
            }
            let referrers = db.referenced_by(object.oref(), None)?;
            if !referrers.is_empty() {
                let names: Vec<String> = referrers.iter().map(ObjectRef::full_name).collect();
                println!("  {} {}", "referenced by".dimmed(), names.join(", "));
            }
            Ok(())
        }
    }
}

fn cmd_new(args: NewArgs, config: DbConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let mut db = open(&args.spec, config)?;
    let assignments = args
        .fields
        .iter()
        .map(|a| parse_assignment(&db, &args.class, a))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut object = match &args.file {
        Some(file) => db.create_obj_at(file, &args.class, &args.id)?,
        None => db.create_obj(&args.class, &args.id)?,
    };
    for (name, field) in assignments {
        object.set(&name, field)?;
    }
    let oref = object.into_ref();
    let message = args
        .message
        .unwrap_or_else(|| format!("create {}", oref.full_name()));
    let summary = db.commit(&message)?;
    report_commit(&summary, format)
}

/// `name=value`. Relation values are object ids, comma separated for
/// multi-valued relations, optionally as `id@Class`; attribute values are
/// JSON, or a plain string when they do not parse.
fn parse_assignment(
    db: &Configuration,
    class: &str,
    assignment: &str,
) -> anyhow::Result<(String, cfgdb::Field)> {
    let Some((name, raw)) = assignment.split_once('=') else {
        bail!("expected NAME=VALUE, got {assignment:?}");
    };
    let schema = db.schema()?;
    if let Some(relation) = schema.relation(class, name) {
        let targets = raw
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                if id.contains('@') {
                    Ok(ObjectRef::parse_full_name(id)?)
                } else {
                    Ok(ObjectRef::new(relation.class.as_str(), id))
                }
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        let value = if relation.cardinality.is_multi() {
            cfgdb::Relation::Multi(targets)
        } else {
            if targets.len() > 1 {
                bail!("relation {name} takes a single object");
            }
            cfgdb::Relation::Single(targets.into_iter().next())
        };
        return Ok((name.to_string(), value.into()));
    }
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw));
    Ok((name.to_string(), value.into()))
}

fn cmd_rm(args: RmArgs, config: DbConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let mut db = open(&args.spec, config)?;
    let oref = ObjectRef::new(args.class.as_str(), args.id.as_str());
    db.destroy_obj(&oref)?;
    let message = args
        .message
        .unwrap_or_else(|| format!("destroy {}", oref.full_name()));
    let summary = db.commit(&message)?;
    report_commit(&summary, format)
}

fn cmd_test(args: TestArgs, config: DbConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let db = open(&args.spec, config)?;
    let exists = db.test_object(&args.class, &args.id, args.depth, &mut HashSet::new());
    match format {
        OutputFormat::Json => print_json(json!({ "exists": exists })),
        OutputFormat::Text => {
            let name = format!("{}@{}", args.id, args.class);
            if exists {
                println!("{} {name} exists", "✓".green().bold());
            } else {
                println!("{} {name} does not exist", "✗".red().bold());
            }
            Ok(())
        }
    }
}

fn cmd_check(args: CheckArgs, config: DbConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let db = open(&args.spec, config)?;
    match db.check() {
        Ok(checked) => match format {
            OutputFormat::Json => print_json(json!({ "valid": true, "objects_checked": checked })),
            OutputFormat::Text => {
                println!("{} {checked} object(s) checked, no violations", "✓".green().bold());
                Ok(())
            }
        },
        Err(e) => {
            let Some(report) = e.report() else {
                return Err(e.into());
            };
            match format {
                OutputFormat::Json => print_json(json!({
                    "valid": false,
                    "violations": report.violations.iter().map(ToString::to_string).collect::<Vec<_>>(),
                }))?,
                OutputFormat::Text => {
                    for violation in &report.violations {
                        println!("{} {violation}", "✗".red());
                    }
                }
            }
            bail!("{} violation(s)", report.violations.len())
        }
    }
}

// ---------------------------------------------------------------------------
// Schema introspection
// ---------------------------------------------------------------------------

/// A schema file, or the schema a database uses.
fn load_registry(source: &str, config: DbConfig) -> anyhow::Result<SchemaRegistry> {
    if let Ok(registry) = SchemaRegistry::load(&[source]) {
        return Ok(registry);
    }
    let db = open(source, config)?;
    Ok(db.schema()?.clone())
}

fn cmd_classes(args: ClassesArgs, config: DbConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let registry = load_registry(&args.source, config)?;
    if let OutputFormat::Json = format {
        let mut classes = Vec::new();
        for class in registry.classes() {
            classes.push(json!({
                "name": class,
                "superclasses": registry.superclasses(class, false)?,
                "attributes": registry.attributes(class, true)?.iter().map(|a| &a.name).collect::<Vec<_>>(),
                "relations": registry.relations(class, true)?.iter().map(|r| &r.name).collect::<Vec<_>>(),
            }));
        }
        return print_json(json!(classes));
    }

    for class in registry.classes() {
        let bases = registry.superclasses(class, false)?;
        if bases.is_empty() {
            println!("{}", class.cyan().bold());
        } else {
            println!("{} : {}", class.cyan().bold(), bases.join(", "));
        }
        if !args.long {
            continue;
        }
        for attr in registry.attributes(class, true)? {
            let multi = if attr.multi_value { "[]" } else { "" };
            println!("  {} {}{multi}", attr.name, attr.ty.to_string().dimmed());
        }
        for rel in registry.relations(class, true)? {
            println!("  {} -> {} {}", rel.name, rel.class.yellow(), rel.cardinality.to_string().dimmed());
        }
    }
    Ok(())
}

fn cmd_domains(args: DomainsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let registry = SchemaRegistry::load(&[&args.schema])
        .with_context(|| format!("cannot load schema {}", args.schema.display()))?;
    let domains = registry.inheritance_domains();
    match format {
        OutputFormat::Json => print_json(json!(domains)),
        OutputFormat::Text => {
            for (i, domain) in domains.iter().enumerate() {
                let names: Vec<&str> = domain.iter().map(String::as_str).collect();
                println!("{} {}", format!("domain {}:", i + 1).bold(), names.join(", "));
            }
            Ok(())
        }
    }
}
