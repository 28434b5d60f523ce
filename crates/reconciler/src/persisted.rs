//! 영속 컨테이너 설정 편집
//!
//! Proxmox `<id>.conf`는 `key: value` 줄로 이루어진 텍스트입니다.
//! 첫 `[section]` 헤더(스냅샷 등) 이전의 메인 섹션만 편집 대상이며,
//! 주석과 나머지 줄은 그대로 보존합니다.
//!
//! 지시문 적용은 멱등입니다. 같은 지시문을 두 번 적용해도 결과가 같습니다.

use lxcward_core::config::PrivilegeConfig;

/// 지시문 적용 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectiveMode {
    /// 같은 키의 줄을 교체하고, 없으면 추가
    Replace,
    /// 같은 키가 없을 때만 추가
    AppendIfAbsent,
}

/// 설정 지시문 한 줄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directive {
    /// 키 (예: `unprivileged`)
    pub key: String,
    /// 값 (예: `0`)
    pub value: String,
    /// 적용 방식
    pub mode: DirectiveMode,
}

impl Directive {
    /// 교체-또는-추가 지시문
    pub fn replace(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            mode: DirectiveMode::Replace,
        }
    }

    /// 없을 때만 추가하는 지시문
    pub fn append_if_absent(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            mode: DirectiveMode::AppendIfAbsent,
        }
    }

    fn line(&self) -> String {
        format!("{}: {}", self.key, self.value)
    }
}

/// 권한 전환에 필요한 지시문 집합
///
/// - `unprivileged: 0` (교체)
/// - `lxc.apparmor.profile: <profile>` (없을 때만)
/// - `startup: up=<timeout>` (없을 때만)
pub fn privilege_directives(config: &PrivilegeConfig) -> Vec<Directive> {
    vec![
        Directive::replace("unprivileged", "0"),
        Directive::append_if_absent("lxc.apparmor.profile", config.apparmor_profile.clone()),
        Directive::append_if_absent("startup", format!("up={}", config.start_timeout_secs)),
    ]
}

/// 파싱된 영속 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedConfig {
    lines: Vec<String>,
}

impl PersistedConfig {
    /// 설정 텍스트를 파싱합니다. 실패하지 않습니다.
    pub fn parse(text: &str) -> Self {
        Self {
            lines: text.lines().map(str::to_owned).collect(),
        }
    }

    /// 메인 섹션에서 키의 값을 찾습니다.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines[..self.main_end()]
            .iter()
            .find_map(|line| split_directive(line).filter(|(k, _)| *k == key))
            .map(|(_, v)| v)
    }

    /// 지시문을 적용합니다. 내용이 바뀌었으면 `true`를 반환합니다.
    pub fn apply(&mut self, directive: &Directive) -> bool {
        let end = self.main_end();
        let matches: Vec<usize> = (0..end)
            .filter(|&i| split_directive(&self.lines[i]).is_some_and(|(k, _)| k == directive.key))
            .collect();

        match (directive.mode, matches.first()) {
            (_, None) => {
                let at = self.lines[..end]
                    .iter()
                    .rposition(|line| !line.trim().is_empty())
                    .map_or(0, |i| i + 1);
                self.lines.insert(at, directive.line());
                true
            }
            (DirectiveMode::AppendIfAbsent, Some(_)) => false,
            (DirectiveMode::Replace, Some(&first)) => {
                let wanted = directive.line();
                let mut changed = false;
                if split_directive(&self.lines[first]).map(|(_, v)| v) != Some(directive.value.as_str()) {
                    self.lines[first] = wanted;
                    changed = true;
                }
                // 중복 키 제거 (뒤에서부터)
                for &dup in matches[1..].iter().rev() {
                    self.lines.remove(dup);
                    changed = true;
                }
                changed
            }
        }
    }

    /// 지시문 목록을 순서대로 적용합니다. 하나라도 바뀌면 `true`입니다.
    pub fn apply_all(&mut self, directives: &[Directive]) -> bool {
        directives
            .iter()
            .fold(false, |changed, d| self.apply(d) || changed)
    }

    /// 텍스트로 렌더링합니다. 항상 개행으로 끝납니다.
    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// 첫 섹션 헤더의 인덱스 (없으면 줄 수)
    fn main_end(&self) -> usize {
        self.lines
            .iter()
            .position(|line| line.trim_start().starts_with('['))
            .unwrap_or(self.lines.len())
    }
}

/// `key: value` 줄을 나눕니다. 주석과 빈 줄은 `None`입니다.
fn split_directive(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let (key, value) = trimmed.split_once(':')?;
    Some((key.trim(), value.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# agent container
arch: amd64
hostname: agent-01
memory: 4096
unprivileged: 1

[snapshot-pre-upgrade]
arch: amd64
unprivileged: 1
";

    #[test]
    fn get_reads_main_section_only() {
        let config = PersistedConfig::parse(SAMPLE);
        assert_eq!(config.get("hostname"), Some("agent-01"));
        assert_eq!(config.get("unprivileged"), Some("1"));
        assert_eq!(config.get("lxc.apparmor.profile"), None);
    }

    #[test]
    fn replace_changes_existing_value() {
        let mut config = PersistedConfig::parse(SAMPLE);
        assert!(config.apply(&Directive::replace("unprivileged", "0")));
        assert_eq!(config.get("unprivileged"), Some("0"));
        // snapshot section untouched
        assert!(config.render().contains("[snapshot-pre-upgrade]\narch: amd64\nunprivileged: 1\n"));
    }

    #[test]
    fn replace_with_same_value_is_noop() {
        let mut config = PersistedConfig::parse("unprivileged: 0\n");
        assert!(!config.apply(&Directive::replace("unprivileged", "0")));
        assert_eq!(config.render(), "unprivileged: 0\n");
    }

    #[test]
    fn replace_appends_when_absent() {
        let mut config = PersistedConfig::parse("arch: amd64\n");
        assert!(config.apply(&Directive::replace("unprivileged", "0")));
        assert_eq!(config.render(), "arch: amd64\nunprivileged: 0\n");
    }

    #[test]
    fn replace_removes_duplicates() {
        let mut config = PersistedConfig::parse("unprivileged: 1\narch: amd64\nunprivileged: 1\n");
        assert!(config.apply(&Directive::replace("unprivileged", "0")));
        assert_eq!(config.render(), "unprivileged: 0\narch: amd64\n");
    }

    #[test]
    fn append_if_absent_keeps_existing_value() {
        let mut config = PersistedConfig::parse("lxc.apparmor.profile: generated\n");
        assert!(!config.apply(&Directive::append_if_absent("lxc.apparmor.profile", "unconfined")));
        assert_eq!(config.get("lxc.apparmor.profile"), Some("generated"));
    }

    #[test]
    fn appended_lines_stay_in_main_section() {
        let mut config = PersistedConfig::parse(SAMPLE);
        config.apply(&Directive::append_if_absent("startup", "up=300"));
        let rendered = config.render();
        assert!(rendered.contains("unprivileged: 1\nstartup: up=300\n\n[snapshot-pre-upgrade]"));
    }

    #[test]
    fn comments_are_preserved() {
        let mut config = PersistedConfig::parse(SAMPLE);
        config.apply(&Directive::replace("unprivileged", "0"));
        assert!(config.render().starts_with("# agent container\n"));
    }

    #[test]
    fn empty_config_gets_directive() {
        let mut config = PersistedConfig::parse("");
        assert!(config.apply(&Directive::replace("unprivileged", "0")));
        assert_eq!(config.render(), "unprivileged: 0\n");
    }

    #[test]
    fn privilege_directives_are_idempotent() {
        let directives = privilege_directives(&PrivilegeConfig::default());

        let mut once = PersistedConfig::parse(SAMPLE);
        assert!(once.apply_all(&directives));
        let after_once = once.render();

        let mut twice = PersistedConfig::parse(&after_once);
        assert!(!twice.apply_all(&directives));
        assert_eq!(twice.render(), after_once);
    }

    #[test]
    fn privilege_directives_use_config_values() {
        let config = PrivilegeConfig {
            apparmor_profile: "lxc-container-default-cgns".to_owned(),
            start_timeout_secs: 120,
            ..PrivilegeConfig::default()
        };
        let mut persisted = PersistedConfig::parse("arch: amd64\n");
        persisted.apply_all(&privilege_directives(&config));

        assert_eq!(persisted.get("unprivileged"), Some("0"));
        assert_eq!(
            persisted.get("lxc.apparmor.profile"),
            Some("lxc-container-default-cgns")
        );
        assert_eq!(persisted.get("startup"), Some("up=120"));
    }
}
