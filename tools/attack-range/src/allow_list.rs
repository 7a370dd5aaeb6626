use std::{fs, io::ErrorKind, net::IpAddr, path::Path};

use crate::{public_ip::PublicIpLookup, tfvars::TfVars, RangeDir};

pub const ALLOWED_IP_VARIABLE: &str = "allowed_ip";

const ALLOWED_IP_DECLARATION: &str = r#"variable "allowed_ip" {
  description = "IP address allowed to connect to the Attack Range"
  type        = string
  default     = "0.0.0.0/0"
}
"#;

/// A single host CIDR for the address, `/32` for IPv4 and `/128` for IPv6.
pub fn allowed_cidr(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(ip) => format!("{ip}/32"),
        IpAddr::V6(ip) => format!("{ip}/128"),
    }
}

/// Points the `allowed_ip` assignment of a tfvars document at `cidr`.
pub fn patch_values(contents: &str, cidr: &str) -> String {
    let mut tfvars = TfVars::parse(contents);
    tfvars.set_string(ALLOWED_IP_VARIABLE, cidr);
    tfvars.render()
}

/// Appends the `allowed_ip` variable block unless the name already appears somewhere in the
/// declarations. Returns `None` when nothing needs to change.
pub fn patch_declarations(contents: &str) -> Option<String> {
    if contents.contains(ALLOWED_IP_VARIABLE) {
        return None;
    }

    let separator = if contents.is_empty() {
        ""
    } else if contents.ends_with('\n') {
        "\n"
    } else {
        "\n\n"
    };

    Some(format!("{contents}{separator}{ALLOWED_IP_DECLARATION}"))
}

/// Reads a file we are about to patch, `None` if it doesn't exist.
fn read_if_exists(path: &Path) -> anyhow::Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Looks up the current public IP and writes it into the Terraform values and declarations.
///
/// Returns the CIDR that was written.
pub async fn sync_allow_list(
    range_dir: &RangeDir,
    ip_lookup: &dyn PublicIpLookup,
) -> anyhow::Result<String> {
    let cidr = allowed_cidr(ip_lookup.current_ip().await?);

    let tfvars_path = range_dir.tfvars_path();
    match read_if_exists(&tfvars_path)? {
        Some(contents) => {
            let patched = patch_values(&contents, &cidr);
            if patched != contents {
                fs::write(&tfvars_path, patched)?;
            }
            tracing::info!("Updated allowed IP to: {}", cidr);
        }
        None => tracing::warn!(
            "{} not found, the allowed IP was not written",
            tfvars_path.display()
        ),
    }

    let variables_path = range_dir.variables_path();
    match read_if_exists(&variables_path)? {
        Some(contents) => {
            if let Some(patched) = patch_declarations(&contents) {
                fs::write(&variables_path, patched)?;
                tracing::info!(
                    "Declared {} variable in {}",
                    ALLOWED_IP_VARIABLE,
                    variables_path.display()
                );
            }
        }
        None => tracing::warn!(
            "{} not found, the {} variable was not declared",
            variables_path.display(),
            ALLOWED_IP_VARIABLE
        ),
    }

    Ok(cidr)
}
