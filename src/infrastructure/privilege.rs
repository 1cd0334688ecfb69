//! 权限与系统信息

use serde::Serialize;
use std::fmt;
use std::process::Command;
use tracing::debug;

const ADMIN_CHECK: &str = "([Security.Principal.WindowsPrincipal][Security.Principal.WindowsIdentity]::GetCurrent()).IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)";

/// 当前进程是否具有管理员权限
///
/// 非 Windows 平台没有机器级注册表，始终返回 false
#[must_use]
pub fn is_elevated() -> bool {
    #[cfg(windows)]
    {
        let output = Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", ADMIN_CHECK])
            .output();

        match output {
            Ok(out) if out.status.success() => {
                let text = String::from_utf8_lossy(&out.stdout);
                parse_admin_check(&text)
            }
            Ok(out) => {
                debug!(status = ?out.status, "管理员权限检测失败");
                false
            }
            Err(e) => {
                debug!(error = %e, "无法执行 PowerShell");
                false
            }
        }
    }

    #[cfg(not(windows))]
    {
        debug!(check = ADMIN_CHECK, "非 Windows 平台，跳过管理员权限检测");
        false
    }
}

#[cfg_attr(not(windows), allow(dead_code))]
fn parse_admin_check(output: &str) -> bool {
    output.trim().eq_ignore_ascii_case("true")
}

/// 当前用户（whoami，失败时回退到 USERNAME / USER）
#[must_use]
pub fn current_user() -> String {
    let from_whoami = Command::new("whoami")
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string())
        .filter(|name| !name.is_empty());

    from_whoami
        .or_else(|| std::env::var("USERNAME").ok())
        .or_else(|| std::env::var("USER").ok())
        .unwrap_or_else(|| "未知用户".to_string())
}

/// 系统运行状态
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub user: String,
    pub elevated: bool,
    pub os: &'static str,
    pub arch: &'static str,
    pub version: &'static str,
}

impl SystemInfo {
    pub fn collect() -> Self {
        Self {
            user: current_user(),
            elevated: is_elevated(),
            os: std::env::consts::OS,
            arch: std::env::consts::ARCH,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

impl fmt::Display for SystemInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "当前用户: {}", self.user)?;
        writeln!(
            f,
            "管理员权限: {}",
            if self.elevated { "是" } else { "否" }
        )?;
        write!(
            f,
            "平台: {} ({}) | 版本: v{}",
            self.os, self.arch, self.version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_admin_check() {
        assert!(parse_admin_check("True\r\n"));
        assert!(!parse_admin_check("False\r\n"));
        assert!(!parse_admin_check(""));
    }

    #[test]
    fn test_current_user_never_empty() {
        assert!(!current_user().is_empty());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_not_elevated_off_windows() {
        assert!(!is_elevated());
    }

    #[test]
    fn test_system_info_display() {
        let info = SystemInfo {
            user: "alice".to_string(),
            elevated: false,
            os: "windows",
            arch: "x86_64",
            version: "0.1.0",
        };
        let text = info.to_string();
        assert!(text.contains("alice"));
        assert!(text.contains("管理员权限: 否"));
    }
}
