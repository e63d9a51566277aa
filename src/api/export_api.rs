// ==========================================
// 仓储 ERP 后台 - 导出文件下载 API
// ==========================================

use crate::api::error::ApiResult;
use crate::export::ExportStaging;

pub struct ExportApi {
    staging: ExportStaging,
}

impl ExportApi {
    pub fn new(staging: ExportStaging) -> Self {
        Self { staging }
    }

    /// 按文件名读取已生成的工作簿
    ///
    /// # 错误
    /// - InvalidInput: 文件名含路径成分
    /// - NotFound: 文件不存在
    pub fn open_export(&self, name: &str) -> ApiResult<Vec<u8>> {
        Ok(self.staging.read(name)?)
    }
}
