// ==========================================
// 仓储 ERP 后台 - 导出文件暂存目录
// ==========================================
// 职责: 生成唯一文件名、按文件名取回已生成的工作簿
// 红线: 下载只接受纯文件名（拒绝路径分隔符与 ".."）
// ==========================================

use crate::export::error::{ExportError, ExportResult};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// 导出文件名前缀
pub const EXPORT_FILE_PREFIX: &str = "DTO";

#[derive(Debug, Clone)]
pub struct ExportStaging {
    dir: PathBuf,
}

impl ExportStaging {
    /// 创建暂存目录（不存在时自动创建）
    pub fn new(dir: impl Into<PathBuf>) -> ExportResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 生成新文件名与完整路径: `DTO_<时间戳>_<uuid 前 8 位>.xlsx`
    pub fn allocate_file(&self) -> (String, PathBuf) {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        let name = format!(
            "{}_{}_{}.xlsx",
            EXPORT_FILE_PREFIX,
            Local::now().format("%Y%m%d%H%M%S"),
            &uuid[..8]
        );
        let path = self.dir.join(&name);
        (name, path)
    }

    /// 按文件名定位已生成的文件
    pub fn resolve(&self, name: &str) -> ExportResult<PathBuf> {
        if !is_plain_file_name(name) {
            warn!(name, "拒绝非法下载文件名");
            return Err(ExportError::InvalidFileName(name.to_string()));
        }
        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(ExportError::NotFound(name.to_string()));
        }
        debug!(path = %path.display(), "定位导出文件");
        Ok(path)
    }

    /// 读取已生成的文件内容
    pub fn read(&self, name: &str) -> ExportResult<Vec<u8>> {
        let path = self.resolve(name)?;
        Ok(std::fs::read(path)?)
    }
}

/// 纯文件名: 非空，不含 `/`、`\`、`..`
pub fn is_plain_file_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty()
        && trimmed == name
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains("..")
}
