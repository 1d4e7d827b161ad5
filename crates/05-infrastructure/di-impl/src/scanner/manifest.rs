//! 清单扫描器
//!
//! 在每个根路径（目录或 zip / jar 归档）下查找 `META-INF/services`，
//! 其中每个文件以契约的完全限定名命名，每行是一个实现类型的完全限定名，
//! 以 `#` 开头的行为注释。

use super::{register_candidates, Scanner, ScannerConfig, MANIFEST_SCANNER};
use crate::registry::ServiceRegistry;
use di_abstractions::{TypeDescriptor, TypeResolver};
use infrastructure_common::{ComponentError, ComponentResult};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// 清单所在的资源目录
pub const SERVICE_MANIFEST_DIR: &str = "META-INF/services";

/// 清单扫描器
pub struct ManifestScanner {
    roots: Vec<PathBuf>,
    resolver: Arc<dyn TypeResolver>,
    config: ScannerConfig,
}

impl ManifestScanner {
    /// 创建清单扫描器
    pub fn new(roots: Vec<PathBuf>, resolver: Arc<dyn TypeResolver>, config: ScannerConfig) -> Self {
        Self {
            roots,
            resolver,
            config,
        }
    }

    /// 扫描根路径
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn scan_root(&self, root: &Path, registry: &ServiceRegistry) -> ComponentResult<()> {
        if root.is_dir() {
            self.scan_directory(root, registry);
            Ok(())
        } else if is_archive(root) {
            self.scan_archive(root, registry)
        } else {
            debug!("[{}] 跳过根路径: {}", self.name(), root.display());
            Ok(())
        }
    }

    fn scan_directory(&self, root: &Path, registry: &ServiceRegistry) {
        let dir = root.join(SERVICE_MANIFEST_DIR);
        if !dir.is_dir() {
            debug!("[{}] 目录中没有清单: {}", self.name(), root.display());
            return;
        }
        for entry in WalkDir::new(&dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("[{}] 无法读取清单条目: {}", self.name(), err);
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let contract = entry.file_name().to_string_lossy().into_owned();
            match std::fs::read_to_string(entry.path()) {
                Ok(content) => self.process_manifest(&contract, &content, registry),
                Err(err) => warn!(
                    "[{}] 无法读取清单文件 {}: {}",
                    self.name(),
                    entry.path().display(),
                    err
                ),
            }
        }
    }

    fn scan_archive(&self, path: &Path, registry: &ServiceRegistry) -> ComponentResult<()> {
        let file = File::open(path).map_err(|err| {
            ComponentError::scan_error(format!("无法打开归档 {}: {}", path.display(), err))
        })?;
        let mut archive = zip::ZipArchive::new(file).map_err(|err| {
            ComponentError::scan_error(format!("无法解析归档 {}: {}", path.display(), err))
        })?;

        let prefix = format!("{SERVICE_MANIFEST_DIR}/");
        let mut manifests: Vec<(String, String, String)> = Vec::new();
        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("[{}] 无法读取归档条目 #{}: {}", self.name(), index, err);
                    continue;
                }
            };
            if entry.is_dir() {
                continue;
            }
            let entry_name = entry.name().to_string();
            let Some(relative) = entry_name.strip_prefix(&prefix) else {
                continue;
            };
            let contract = relative.rsplit('/').next().unwrap_or(relative).to_string();
            if contract.is_empty() {
                continue;
            }
            let mut content = String::new();
            match entry.read_to_string(&mut content) {
                Ok(_) => manifests.push((entry_name.clone(), contract, content)),
                Err(err) => warn!(
                    "[{}] 无法读取归档清单 {}!{}: {}",
                    self.name(),
                    path.display(),
                    entry_name,
                    err
                ),
            }
        }

        manifests.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, contract, content) in manifests {
            self.process_manifest(&contract, &content, registry);
        }
        Ok(())
    }

    fn process_manifest(&self, contract_name: &str, content: &str, registry: &ServiceRegistry) {
        let Some(contract) = self.resolver.resolve(contract_name) else {
            warn!("[{}] 无法解析契约类型: {}", self.name(), contract_name);
            return;
        };
        let candidates = manifest_entries(content).filter_map(|line| {
            let resolved: Option<Arc<TypeDescriptor>> = self.resolver.resolve(line);
            if resolved.is_none() {
                warn!(
                    "[{}] 无法解析实现类型: {} (契约: {})",
                    self.name(),
                    line,
                    contract_name
                );
            }
            resolved
        });
        let appended = register_candidates(registry, self, contract, candidates);
        debug!(
            "[{}] 清单 {} 追加了 {} 个提供者",
            self.name(),
            contract_name,
            appended
        );
    }
}

impl Scanner for ManifestScanner {
    fn name(&self) -> &str {
        MANIFEST_SCANNER
    }

    fn config(&self) -> &ScannerConfig {
        &self.config
    }

    fn scan(&self, registry: &ServiceRegistry) -> bool {
        info!("[{}] 开始扫描 {} 个根路径", self.name(), self.roots.len());
        let mut succeeded = true;
        for root in &self.roots {
            if let Err(err) = self.scan_root(root, registry) {
                error!("[{}] {}", self.name(), err);
                succeeded = false;
            }
        }
        info!("[{}] 扫描完成", self.name());
        succeeded
    }
}

/// 清单内容中的有效行：去掉首尾空白，跳过空行与 `#` 注释行
pub fn manifest_entries(content: &str) -> impl Iterator<Item = &str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
}

fn is_archive(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("zip") || ext.eq_ignore_ascii_case("jar"))
            .unwrap_or(false)
}
