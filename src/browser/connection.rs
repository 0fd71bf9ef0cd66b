use anyhow::Result;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// 连接到浏览器并定位考试页面
///
/// 优先复用 URL 匹配的已打开页面（学员可能已经登录），
/// 找不到时新建页面并导航到考试界面
pub async fn connect_to_exam_page(port: u16, exam_page_url: &str) -> Result<(Browser, Page)> {
    let browser_url = format!("http://localhost:{}", port);
    info!("正在连接到浏览器: {}", browser_url);

    let (browser, mut handler) = Browser::connect(&browser_url).await.map_err(|e| {
        error!("连接浏览器失败: {}", e);
        e
    })?;
    debug!("浏览器连接成功");

    // 在后台处理浏览器事件
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    let pages = browser.pages().await?;
    debug!("获取到 {} 个页面", pages.len());

    // 查找已经打开的考试页面
    for p in pages.iter() {
        if let Ok(Some(url)) = p.url().await {
            debug!("检查页面 URL: {}", url);
            if url.starts_with(exam_page_url) {
                info!("✓ 复用已打开的考试页面: {}", url);
                return Ok((browser, p.clone()));
            }
        }
    }

    debug!("未找到考试页面，创建新页面并导航到: {}", exam_page_url);
    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        e
    })?;
    page.goto(exam_page_url).await.map_err(|e| {
        error!("导航到 {} 失败: {}", exam_page_url, e);
        e
    })?;
    info!("已导航到: {}", exam_page_url);

    Ok((browser, page))
}
