// Command-line surface: expand, match, and check templates

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use url::Url;

use crate::config::{format_by_name, BindingsFile};
use crate::domain::template::{Template, TemplateResolver};
use crate::domain::value::ShapeHints;

pub fn cli() -> Command {
    Command::new("urimatch")
        .about("Expand RFC 6570 URI templates and match URIs back to their variables")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("expand")
                .about("Render a template with variable bindings")
                .arg(template_arg())
                .arg(file_arg())
                .arg(
                    Arg::new("var")
                        .short('v')
                        .long("var")
                        .value_name("NAME=VALUE")
                        .action(ArgAction::Append)
                        .help("Bind a variable to a string value (repeatable)"),
                )
                .arg(base_arg()),
        )
        .subcommand(
            Command::new("match")
                .about("Recover variable bindings from a URI, printed as a bindings document")
                .arg(template_arg())
                .arg(
                    Arg::new("text")
                        .required(true)
                        .value_name("URI")
                        .help("Text to match against the template"),
                )
                .arg(file_arg())
                .arg(
                    Arg::new("list")
                        .long("list")
                        .value_name("NAME")
                        .action(ArgAction::Append)
                        .help("Treat the variable as a list"),
                )
                .arg(
                    Arg::new("map")
                        .long("map")
                        .value_name("NAME")
                        .action(ArgAction::Append)
                        .help("Treat the variable as a map"),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .value_name("FORMAT")
                        .value_parser(["json", "yaml"])
                        .default_value("json")
                        .help("Output format for the recovered bindings"),
                )
                .arg(base_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Parse a template and print its canonical form and variables")
                .arg(template_arg()),
        )
}

fn template_arg() -> Arg {
    Arg::new("template")
        .required(true)
        .value_name("TEMPLATE")
        .help("RFC 6570 URI template, e.g. /users{/id}{?fields*}")
}

fn file_arg() -> Arg {
    Arg::new("file")
        .short('f')
        .long("file")
        .value_name("FILE")
        .help("YAML or JSON file with `variables` and `hints` sections")
}

fn base_arg() -> Arg {
    Arg::new("base")
        .short('b')
        .long("base")
        .value_name("URL")
        .help("Base URL the template is relative to")
}

/// Run the selected subcommand and return what should be printed
pub fn run(matches: &ArgMatches) -> Result<String> {
    match matches.subcommand() {
        Some(("expand", sub)) => expand(sub),
        Some(("match", sub)) => match_text(sub),
        Some(("check", sub)) => check(sub),
        Some((other, _)) => bail!("Unknown command '{}'", other),
        None => bail!("No command given"),
    }
}

fn parse_template(matches: &ArgMatches) -> Result<Template> {
    let text = string_arg(matches, "template").context("Missing template")?;
    Template::parse(text).with_context(|| format!("Invalid template '{}'", text))
}

fn load_file(matches: &ArgMatches) -> Result<BindingsFile> {
    match string_arg(matches, "file") {
        Some(path) => BindingsFile::load(path),
        None => Ok(BindingsFile::default()),
    }
}

fn parse_base(matches: &ArgMatches) -> Result<Option<Url>> {
    string_arg(matches, "base")
        .map(|base| Url::parse(base).with_context(|| format!("Invalid base URL '{}'", base)))
        .transpose()
}

fn expand(matches: &ArgMatches) -> Result<String> {
    let template = parse_template(matches)?;
    let mut file = load_file(matches)?;
    for assignment in string_args(matches, "var") {
        file.assign(assignment)?;
    }

    let bindings = file.bindings();
    let undefined = TemplateResolver::new().undefined_variables(&template, &bindings);
    if !undefined.is_empty() {
        tracing::info!(variables = ?undefined, "expanding with undefined variables");
    }

    match parse_base(matches)? {
        Some(base) => Ok(template.expand_url(&base, &bindings)?.to_string()),
        None => Ok(template.expand(&bindings)),
    }
}

fn match_text(matches: &ArgMatches) -> Result<String> {
    let template = parse_template(matches)?;
    let text = string_arg(matches, "text").context("Missing text to match")?;

    let mut file = load_file(matches)?;
    file.hints
        .list
        .extend(string_args(matches, "list").map(str::to_string));
    file.hints
        .map
        .extend(string_args(matches, "map").map(str::to_string));
    let hints: ShapeHints = file.shape_hints()?;

    let found = match parse_base(matches)? {
        Some(base) => {
            let candidate = Url::parse(text)
                .or_else(|_| base.join(text))
                .with_context(|| format!("Invalid URL '{}'", text))?;
            template.match_url(&base, &candidate, &hints)?
        }
        None => template.match_uri(text, &hints)?,
    };

    let Some(values) = found else {
        bail!("'{}' does not match template '{}'", text, template);
    };

    let name = string_arg(matches, "format").unwrap_or("json");
    let format = format_by_name(name).with_context(|| format!("Unknown format '{}'", name))?;
    Ok(format.serialize(&BindingsFile::from_match(&values))?.trim_end().to_string())
}

fn check(matches: &ArgMatches) -> Result<String> {
    let template = parse_template(matches)?;
    let variables: Vec<String> = template
        .variables()
        .iter()
        .map(|var| var.to_string())
        .collect();

    Ok(format!("{}\nvariables: {}", template, variables.join(", ")))
}

fn string_arg<'a>(matches: &'a ArgMatches, name: &str) -> Option<&'a str> {
    matches.get_one::<String>(name).map(String::as_str)
}

fn string_args<'a>(matches: &'a ArgMatches, name: &str) -> impl Iterator<Item = &'a str> {
    matches
        .get_many::<String>(name)
        .into_iter()
        .flatten()
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_with(args: &[&str]) -> Result<String> {
        let matches = cli().try_get_matches_from(args)?;
        run(&matches)
    }

    #[test]
    fn test_cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn test_expand_with_vars() {
        let out = run_with(&[
            "urimatch", "expand", "/search{?q,lang}", "-v", "q=rust lang", "-v", "lang=en",
        ])
        .unwrap();
        assert_eq!(out, "/search?q=rust%20lang&lang=en");
    }

    #[test]
    fn test_expand_against_base() {
        let out = run_with(&[
            "urimatch",
            "expand",
            "users/{id}",
            "--base",
            "https://api.example.com/v1/",
            "-v",
            "id=42",
        ])
        .unwrap();
        assert_eq!(out, "https://api.example.com/v1/users/42");
    }

    #[test]
    fn test_match_prints_json() {
        let out = run_with(&[
            "urimatch", "match", "/users/{id}{?tags}", "/users/7?tags=a,b", "--list", "tags",
        ])
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["variables"]["id"], "7");
        assert_eq!(json["variables"]["tags"], serde_json::json!(["a", "b"]));
        assert_eq!(json["hints"]["list"], serde_json::json!(["tags"]));
    }

    #[test]
    fn test_match_output_feeds_expand() {
        let out = run_with(&[
            "urimatch", "match", "{/path*}{?q}", "/a/b?q=x", "--format", "yaml",
        ])
        .unwrap();
        let file = BindingsFile::from_yaml(&out).unwrap();
        assert_eq!(file.hints.list, vec!["path"]);

        let template = Template::parse("{/path*}{?q}").unwrap();
        assert_eq!(template.expand(&file.bindings()), "/a/b?q=x");
    }

    #[test]
    fn test_match_rejects_unknown_format() {
        assert!(run_with(&["urimatch", "match", "{x}", "y", "--format", "toml"]).is_err());
    }

    #[test]
    fn test_match_relative_to_base() {
        let out = run_with(&[
            "urimatch",
            "match",
            "users/{id}",
            "https://api.example.com/v1/users/42",
            "--base",
            "https://api.example.com/v1/",
        ])
        .unwrap();
        let json: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["variables"]["id"], "42");
    }

    #[test]
    fn test_match_failure_is_an_error() {
        let err = run_with(&["urimatch", "match", "/users/{id}", "/groups/7"]).unwrap_err();
        assert!(err.to_string().contains("does not match"));
    }

    #[test]
    fn test_check_prints_canonical_form() {
        let out = run_with(&["urimatch", "check", "{/path*}{?q,page:2}"]).unwrap();
        assert_eq!(out, "{/path*}{?q,page:2}\nvariables: path*, q, page:2");
    }

    #[test]
    fn test_check_reports_syntax_error() {
        let err = run_with(&["urimatch", "check", "{unclosed"]).unwrap_err();
        assert!(format!("{:#}", err).contains("Unterminated expression"));
    }

    #[test]
    fn test_bad_assignment_is_an_error() {
        assert!(run_with(&["urimatch", "expand", "{x}", "-v", "x"]).is_err());
    }
}
