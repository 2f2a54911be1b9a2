#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    single_use_lifetimes,
    missing_debug_implementations,
    large_assignments,
    exported_private_dependencies,
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_docs,
    non_ascii_idents,
    indirect_structural_match,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unused_crate_dependencies,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications
)]

//! # qiniu-ureq
//!
//! ## 七牛 Ureq HTTP 客户端实现
//!
//! 基于 Ureq 库提供 [`qiniu_http::HttpCaller`] 的默认实现。
//! Ureq 仅支持阻塞请求，启用 `async` 功能后，异步接口将在当前任务中以阻塞方式完成请求。

mod client;

pub use client::Client;

pub use qiniu_http as http;
pub use ureq;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use md5::{Digest, Md5};
    use qiniu_http::{
        header::{CONTENT_LENGTH, USER_AGENT},
        HttpCaller, Method, ResponseErrorKind, SyncRequest, SyncRequestBody, TransferProgressInfo,
    };
    use rand::{thread_rng, RngCore};
    use std::{
        io::{copy as io_copy, Read},
        net::{IpAddr, TcpListener},
        sync::{
            atomic::{AtomicU64, Ordering::Relaxed},
            Arc,
        },
    };
    use tokio::{sync::oneshot::channel, task::spawn_blocking};
    use warp::{
        filters::{body::bytes, method::post},
        header::value as header_value,
        http::header::HeaderValue,
        path,
        reply::Response,
        Filter,
    };

    macro_rules! starts_with_server {
        ($addr:ident, $routes:ident, $code:block) => {{
            let (tx, rx) = channel::<()>();
            let ($addr, server) = warp::serve($routes).bind_with_graceful_shutdown(([127, 0, 0, 1], 0), async move {
                rx.await.ok();
            });
            let handler = tokio::spawn(server);
            $code?;
            tx.send(()).ok();
            handler.await.ok();
        }};
    }

    const BUF_LEN: usize = 1 << 20;
    const MD5_LEN: usize = 16;

    #[tokio::test]
    async fn test_post_with_progress() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let routes = path!("mkblk" / u64)
            .and(post())
            .and(header_value(USER_AGENT.as_str()))
            .and(bytes())
            .map(|block_size: u64, user_agent: HeaderValue, req_body: Bytes| {
                assert_eq!(block_size, (BUF_LEN + MD5_LEN) as u64);
                assert_eq!(req_body.len(), BUF_LEN + MD5_LEN);
                {
                    let mut hasher = Md5::new();
                    hasher.update(&req_body[..BUF_LEN]);
                    assert_eq!(hasher.finalize().as_slice(), &req_body[BUF_LEN..]);
                }
                assert!(user_agent.to_str().unwrap().starts_with("QiniuRust/"));
                assert!(user_agent.to_str().unwrap().ends_with("/qiniu-ureq"));

                let mut resp_body = vec![0u8; BUF_LEN + MD5_LEN];
                thread_rng().fill_bytes(&mut resp_body[..BUF_LEN]);
                {
                    let mut hasher = Md5::new();
                    hasher.update(&resp_body[..BUF_LEN]);
                    resp_body[BUF_LEN..].copy_from_slice(hasher.finalize().as_slice());
                }
                Response::new(resp_body.into())
            });
        starts_with_server!(addr, routes, {
            spawn_blocking(move || {
                let mut request_body = vec![0u8; BUF_LEN + MD5_LEN];
                thread_rng().fill_bytes(&mut request_body[..BUF_LEN]);
                {
                    let mut hasher = Md5::new();
                    hasher.update(&request_body[..BUF_LEN]);
                    request_body[BUF_LEN..].copy_from_slice(hasher.finalize().as_slice());
                }

                let last_uploaded = Arc::new(AtomicU64::new(0));
                let last_total = Arc::new(AtomicU64::new(0));
                let callback = {
                    let last_uploaded = last_uploaded.to_owned();
                    let last_total = last_total.to_owned();
                    move |info: &TransferProgressInfo<'_>| -> anyhow::Result<()> {
                        last_uploaded.store(info.transferred_bytes(), Relaxed);
                        last_total.store(info.total_bytes(), Relaxed);
                        Ok(())
                    }
                };
                let mut request = SyncRequest::builder()
                    .method(Method::POST)
                    .url(format!("http://fake.qiniu.test:{}/mkblk/{}", addr.port(), request_body.len()).parse()?)
                    .resolved_ip_addrs(vec![IpAddr::from([127, 0, 0, 1])])
                    .body(SyncRequestBody::from_referenced_bytes(&request_body))
                    .on_uploading_progress(&callback)
                    .build();
                let mut response = Client::default().call(&mut request)?;
                assert_eq!(response.status_code().as_u16(), 200);
                assert_eq!(response.server_ip(), Some(IpAddr::from([127, 0, 0, 1])));
                assert_eq!(response.server_port().map(|port| port.get()), Some(addr.port()));
                assert_eq!(
                    response.header(CONTENT_LENGTH).map(|h| h.as_bytes()),
                    Some(format!("{}", BUF_LEN + MD5_LEN).as_bytes())
                );
                assert_eq!(last_uploaded.load(Relaxed), request_body.len() as u64);
                assert_eq!(last_total.load(Relaxed), request_body.len() as u64);

                let mut body_part = Vec::new();
                let mut checksum_part = Vec::new();
                assert_eq!(
                    io_copy(&mut response.body_mut().take(BUF_LEN as u64), &mut body_part)?,
                    BUF_LEN as u64
                );
                assert_eq!(
                    io_copy(&mut response.body_mut().take(MD5_LEN as u64), &mut checksum_part)?,
                    MD5_LEN as u64
                );
                let mut hasher = Md5::new();
                hasher.update(&body_part);
                assert_eq!(hasher.finalize().as_slice(), checksum_part.as_slice());
                Ok::<_, anyhow::Error>(())
            })
            .await?
        });

        Ok(())
    }

    #[tokio::test]
    async fn test_cancel_by_callback() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let routes = path!("upload").and(post()).and(bytes()).map(|_: Bytes| Response::new("{}".into()));
        starts_with_server!(addr, routes, {
            spawn_blocking(move || {
                let request_body = vec![0u8; BUF_LEN];
                let callback = |_: &TransferProgressInfo<'_>| -> anyhow::Result<()> { Err(anyhow::anyhow!("cancelled")) };
                let mut request = SyncRequest::builder()
                    .method(Method::POST)
                    .url(format!("http://{addr}/upload").parse()?)
                    .body(SyncRequestBody::from_referenced_bytes(&request_body))
                    .on_uploading_progress(&callback)
                    .build();
                let err = Client::default().call(&mut request).unwrap_err();
                assert_eq!(err.kind(), ResponseErrorKind::CallbackError);
                Ok::<_, anyhow::Error>(())
            })
            .await?
        });
        Ok(())
    }

    #[test]
    fn test_connection_refused() -> anyhow::Result<()> {
        env_logger::builder().is_test(true).try_init().ok();

        let port = {
            let listener = TcpListener::bind("127.0.0.1:0")?;
            listener.local_addr()?.port()
        };
        let mut request = SyncRequest::builder()
            .url(format!("http://127.0.0.1:{port}/").parse()?)
            .build();
        let err = Client::default().call(&mut request).unwrap_err();
        assert_eq!(err.kind(), ResponseErrorKind::ConnectError);
        Ok(())
    }
}
