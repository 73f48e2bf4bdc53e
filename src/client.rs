// src/client.rs

use crate::{config::AppConfig, error::*, models::SessionToken};
use log::trace;
use reqwest::{RequestBuilder, Response, header};
use std::time::Duration;

/// 所有请求都携带会话 Cookie 的 HTTP 客户端，默认跟随重定向。
///
/// 客户端本身只限制连接时间和两次读取之间的间隔，大文件传输不受总时长限制；
/// 探测请求另外带有整体超时。
#[derive(Clone)]
pub struct SessionClient {
    pub client: reqwest::Client,
    probe_timeout: Duration,
}

impl SessionClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            probe_timeout: config.timeout,
        })
    }

    /// 发起 GET 请求，非 2xx 状态视为错误。用于下载文件内容。
    pub async fn get(&self, url: &str, session: &SessionToken) -> AppResult<Response> {
        self.send(self.request(url, session)).await
    }

    /// 与 [`get`](Self::get) 相同，但整个请求受 `timeout` 限制。
    pub async fn probe(&self, url: &str, session: &SessionToken) -> AppResult<Response> {
        self.send(self.request(url, session).timeout(self.probe_timeout))
            .await
    }

    fn request(&self, url: &str, session: &SessionToken) -> RequestBuilder {
        trace!("GET {}", url);
        self.client
            .get(url)
            .header(header::COOKIE, session.cookie_header())
    }

    async fn send(&self, request: RequestBuilder) -> AppResult<Response> {
        let res = request.send().await?;
        Ok(res.error_for_status()?)
    }
}
