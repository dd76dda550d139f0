// 该文件是 Chepai （车牌） 项目的一部分。
// src/http_stub.rs - 单元测试用的本地 HTTP 服务
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

//! 在 127.0.0.1 的随机端口上应答 HTTP/1.1 请求，每个连接只处理一个请求。

use std::{
  io::{BufRead, BufReader, Read, Write},
  net::{SocketAddr, TcpListener, TcpStream},
  sync::{Arc, Mutex},
  thread,
};

use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
  pub method: String,
  /// 路径与查询串
  pub target: String,
  pub body: String,
}

type Handler = dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync;

pub struct HttpStub {
  addr: SocketAddr,
  requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl HttpStub {
  /// `handler` 返回状态码与 JSON 响应体
  pub fn serve(
    handler: impl Fn(&RecordedRequest) -> (u16, String) + Send + Sync + 'static,
  ) -> HttpStub {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));

    let recorded = requests.clone();
    let handler: Arc<Handler> = Arc::new(handler);
    thread::spawn(move || {
      for stream in listener.incoming().flatten() {
        let recorded = recorded.clone();
        let handler = handler.clone();
        thread::spawn(move || answer(stream, &*handler, &recorded));
      }
    });

    HttpStub { addr, requests }
  }

  pub fn url(&self, path: &str) -> Url {
    Url::parse(&format!("http://{}{}", self.addr, path)).unwrap()
  }

  pub fn requests(&self) -> Vec<RecordedRequest> {
    self.requests.lock().unwrap().clone()
  }
}

fn answer(stream: TcpStream, handler: &Handler, recorded: &Mutex<Vec<RecordedRequest>>) {
  let mut reader = BufReader::new(stream);
  let mut request_line = String::new();
  if reader.read_line(&mut request_line).is_err() {
    return;
  }
  let mut parts = request_line.split_whitespace();
  let method = parts.next().unwrap_or_default().to_string();
  let target = parts.next().unwrap_or_default().to_string();

  let mut content_length = 0;
  loop {
    let mut line = String::new();
    if reader.read_line(&mut line).unwrap_or(0) == 0 || line.trim().is_empty() {
      break;
    }
    if let Some((name, value)) = line.split_once(':')
      && name.eq_ignore_ascii_case("content-length")
    {
      content_length = value.trim().parse().unwrap_or(0);
    }
  }
  let mut body = vec![0; content_length];
  if reader.read_exact(&mut body).is_err() {
    return;
  }

  let request = RecordedRequest {
    method,
    target,
    body: String::from_utf8_lossy(&body).into_owned(),
  };
  let (status, payload) = handler(&request);
  recorded.lock().unwrap().push(request);

  let response = format!(
    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
    status,
    payload.len(),
    payload
  );
  let mut stream = reader.into_inner();
  let _ = stream.write_all(response.as_bytes());
  let _ = stream.flush();
}
