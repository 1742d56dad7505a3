use crate::api::Resource;
use crate::cli::args::{CliArgs, Command};

fn check_resource(raw: &str) -> Result<(), String> {
    if raw.trim().is_empty() {
        return Err("resource name is empty".to_string());
    }
    if Resource::parse(raw).is_none() {
        let known: Vec<&str> = Resource::ALL.iter().map(|r| r.name()).collect();
        return Err(format!(
            "unknown resource '{raw}', expected one of: {}",
            known.join(", ")
        ));
    }
    Ok(())
}

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid --output-format '{raw}', expected text or json"));
        }
    }
    if let Some(raw) = args.base_url.as_deref() {
        crate::api::parse_base_url(raw).map_err(|e| e.to_string())?;
    }

    match &args.command {
        Command::List(list) => {
            check_resource(&list.resource)?;
            if list.page == Some(0) {
                return Err("invalid page 0, pages start at 1".to_string());
            }
        }
        Command::Show(r) => {
            check_resource(&r.resource)?;
            check_id(&r.id)?;
        }
        Command::Create(c) => check_resource(&c.resource)?,
        Command::Update(u) => {
            check_resource(&u.resource)?;
            check_id(&u.id)?;
        }
        Command::Delete(d) => {
            check_resource(&d.resource)?;
            check_id(&d.id)?;
        }
        Command::Export(e) => check_resource(&e.resource)?,
        Command::Browse(b) => check_resource(&b.resource)?,
        Command::Pages(p) => {
            crate::pagination::PaginationState::new(p.current, p.total)
                .map_err(|e| format!("invalid page position: {e}"))?;
        }
        Command::InitConfig => {}
    }
    Ok(())
}

fn check_id(id: &str) -> Result<(), String> {
    if id.trim().is_empty() {
        return Err("record id is empty".to_string());
    }
    Ok(())
}
