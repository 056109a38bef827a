//! Request verb handlers: get, post, put, delete, download, upload.

use std::path::Path;

use serde_json::{Map, Value};

use fleetdesk_api::{ApiClient, FileMethod, multipart};

use crate::cli::{BodyArgs, Command, DownloadArgs, GlobalOpts, UploadArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(cmd: Command, client: &ApiClient, global: &GlobalOpts) -> Result<(), CliError> {
    let value: Value = match cmd {
        Command::Get(args) => client.get(&args.path, &args.params).await?,
        Command::Delete(args) => client.del(&args.path, &args.params).await?,
        Command::Post(args) => {
            let body = read_body(&args)?;
            client.post(&args.path, &body).await?
        }
        Command::Put(args) => {
            let body = read_body(&args)?;
            client.put(&args.path, &body).await?
        }
        Command::Upload(args) => {
            let form = build_form(&args)?;
            client.upload(&args.path, form).await?
        }
        Command::Download(args) => return download(args, client, global).await,
        // Session, config and completion commands are handled before dispatch
        Command::Login(_) | Command::Logout | Command::Config(_) | Command::Completions(_) => {
            unreachable!()
        }
    };

    output::print_output(&output::render(global.output, &value)?, global.quiet);
    Ok(())
}

/// JSON body from `--data` or `--data-file`, `{}` when neither is given.
fn read_body(args: &BodyArgs) -> Result<Value, CliError> {
    if let Some(ref data) = args.data {
        return Ok(serde_json::from_str(data)?);
    }
    if let Some(ref path) = args.data_file {
        let raw = std::fs::read_to_string(path)?;
        return Ok(serde_json::from_str(&raw)?);
    }
    Ok(Value::Object(Map::new()))
}

fn build_form(args: &UploadArgs) -> Result<multipart::Form, CliError> {
    let bytes = std::fs::read(&args.file)?;
    let file_name = file_name(&args.file)?;

    let mut form = multipart::Form::new();
    for (key, value) in &args.form {
        form = form.text(key.clone(), value.clone());
    }
    Ok(form.part(
        args.field.clone(),
        multipart::Part::bytes(bytes).file_name(file_name),
    ))
}

fn file_name(path: &Path) -> Result<String, CliError> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::Validation {
            field: "file".into(),
            reason: format!("'{}' has no file name", path.display()),
        })
}

async fn download(
    args: DownloadArgs,
    client: &ApiClient,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let method = FileMethod::from(args.method);
    let bytes = match method {
        FileMethod::Get => client.file(&args.path, &args.params, method).await?,
        FileMethod::Post => {
            let body: Map<String, Value> = args
                .params
                .into_iter()
                .map(|(k, v)| (k, Value::String(v)))
                .collect();
            client.file(&args.path, &body, method).await?
        }
    };

    match args.out {
        Some(path) => {
            std::fs::write(&path, &bytes)?;
            if !global.quiet {
                eprintln!("Wrote {} bytes to {}", bytes.len(), path.display());
            }
        }
        None => output::print_bytes(&bytes)?,
    }
    Ok(())
}
