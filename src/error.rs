//! 应用程序错误类型
//!
//! 按来源分类：API / 本地存储 / 答题会话。
//! 浏览器与全屏相关的失败全部按"容忍 + 告警"处理，不进入类型化错误。

use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 本地存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 答题会话错误
    #[error("会话错误: {0}")]
    Session(#[from] SessionError),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): code={code:?}, message={message:?}")]
    BadResponse {
        endpoint: String,
        code: Option<u64>,
        message: Option<String>,
    },
    /// API 返回 data 为空
    #[error("API返回空结果: {endpoint}")]
    EmptyResponse { endpoint: String },
}

/// 本地存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 读取缓存文件失败
    #[error("读取缓存失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入缓存文件失败
    #[error("写入缓存失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 删除缓存文件失败
    #[error("删除缓存失败 ({path}): {source}")]
    DeleteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 缓存内容解析失败
    #[error("缓存解析失败 ({path}): {source}")]
    CacheParseFailed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 答题会话错误
#[derive(Debug, Error)]
pub enum SessionError {
    /// 考试ID为空
    #[error("考试ID不能为空")]
    EmptyExamId,
    /// 尝试在非进行中状态下提交
    #[error("答题状态不允许提交 (当前: {status})")]
    NotInProgress { status: String },
    /// 小节尚有未作答的题目
    #[error("小节 {section_id} 还有 {remaining} 道题未作答")]
    IncompleteSection { section_id: String, remaining: usize },
    /// 脚本引用了不存在的小节或题目
    #[error("脚本引用越界: 小节 {section} 题目 {question}")]
    ScriptReferenceOutOfRange { section: usize, question: usize },
    /// 小节提交失败
    #[error("小节提交失败 ({section_id})")]
    SectionSubmitFailed { section_id: String },
}

/// 应用程序结果类型
pub type AppResult<T> = std::result::Result<T, AppError>;
