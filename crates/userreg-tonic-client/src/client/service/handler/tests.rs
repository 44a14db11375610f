use super::*;
use crate::client::{
    config::Call,
    streaming::{DriverConfig, StreamDriver, coordinator::Completion},
};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::{Code, Request, Response, Status, Streaming, transport::Server};
use userreg_tonic_core::{
    proto::{
        Users,
        user_service_server::{UserService, UserServiceServer},
    },
    types::default_records,
};

/// How the in-process service answers a bidirectional call.
#[derive(Clone, Copy)]
enum Mode {
    /// Reply to every record as it arrives.
    Echo,
    /// Reply to nothing until the client half-closes, then reply in reverse.
    HoldAndReverse,
    /// Echo the first `n` records, then fail the call.
    FailAfter(usize),
    /// Echo on the bidirectional call, but refuse any client-streamed batch
    /// without reading it.
    RejectBatch,
}

struct MockService {
    mode: Mode,
}

fn added(user: Record) -> ResponseEnvelope {
    ResponseEnvelope {
        status: "Added".to_string(),
        user: Some(user),
    }
}

#[tonic::async_trait]
impl UserService for MockService {
    type AddUserVerboseStream = ReceiverStream<core::result::Result<ResponseEnvelope, Status>>;
    type AddUserStreamBothStream = ReceiverStream<core::result::Result<ResponseEnvelope, Status>>;

    async fn add_user(
        &self,
        req: Request<Record>,
    ) -> core::result::Result<Response<Record>, Status> {
        Ok(Response::new(req.into_inner()))
    }

    async fn add_user_verbose(
        &self,
        req: Request<Record>,
    ) -> core::result::Result<Response<Self::AddUserVerboseStream>, Status> {
        let user = req.into_inner();
        let (tx, rx) = mpsc::channel(4);
        tokio::spawn(async move {
            for status in ["Init", "Inserting", "User has been inserted"] {
                let envelope = ResponseEnvelope {
                    status: status.to_string(),
                    user: Some(user.clone()),
                };
                if tx.send(Ok(envelope)).await.is_err() {
                    return;
                }
            }
        });
        Ok(Response::new(ReceiverStream::new(rx)))
    }

    async fn add_users(
        &self,
        req: Request<Streaming<Record>>,
    ) -> core::result::Result<Response<Users>, Status> {
        if let Mode::RejectBatch = self.mode {
            return Err(Status::invalid_argument("batch rejected"));
        }
        let mut inbound = req.into_inner();
        let mut user = Vec::new();
        while let Some(record) = inbound.message().await? {
            user.push(record);
        }
        Ok(Response::new(Users { user }))
    }

    async fn add_user_stream_both(
        &self,
        req: Request<Streaming<Record>>,
    ) -> core::result::Result<Response<Self::AddUserStreamBothStream>, Status> {
        let mut inbound = req.into_inner();
        let mode = self.mode;
        let (tx, rx) = mpsc::channel(16);

        tokio::spawn(async move {
            let mut held = Vec::new();
            let mut seen = 0;
            while let Ok(Some(record)) = inbound.message().await {
                seen += 1;
                let reply = match mode {
                    Mode::Echo | Mode::RejectBatch => Ok(added(record)),
                    Mode::HoldAndReverse => {
                        held.push(record);
                        continue;
                    }
                    Mode::FailAfter(n) if seen > n => {
                        Err(Status::resource_exhausted("registration quota reached"))
                    }
                    Mode::FailAfter(_) => Ok(added(record)),
                };
                let failed = reply.is_err();
                if tx.send(reply).await.is_err() || failed {
                    return;
                }
            }
            for record in held.into_iter().rev() {
                if tx.send(Ok(added(record))).await.is_err() {
                    return;
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}

async fn spawn_service(mode: Mode) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(
        Server::builder()
            .add_service(UserServiceServer::new(MockService { mode }))
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );
    format!("http://{addr}")
}

fn config(server_addr: String, send_interval: Duration) -> ClientConfig {
    ClientConfig {
        server_addr,
        connect_timeout: Duration::from_secs(2),
        compression: None,
        driver: DriverConfig {
            send_interval,
            deadline: Some(Duration::from_secs(10)),
            outbound_buffer_size: 4,
        },
        records: default_records(),
        call: Call::Bidi,
    }
}

async fn client(mode: Mode, send_interval: Duration) -> (UserClient, ClientConfig) {
    let config = config(spawn_service(mode).await, send_interval);
    let client = UserClient::connect(&config).await.unwrap();
    (client, config)
}

async fn run_bidi(mode: Mode, send_interval: Duration) -> (Result<Completion>, Vec<String>) {
    let (client, config) = client(mode, send_interval).await;
    let driver = StreamDriver::new(config.driver.clone());
    let duplex = client.open_user_stream(config.driver.outbound_buffer_size);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let res = driver
        .drive(duplex, config.records, move |resp: &ResponseEnvelope| {
            let _ = tx.send(resp.user_name().to_string());
        })
        .await;

    let mut seen = Vec::new();
    while let Some(name) = rx.recv().await {
        seen.push(name);
    }
    (res, seen)
}

#[tokio::test]
async fn unary_registration_returns_the_record() {
    let (mut client, _) = client(Mode::Echo, Duration::ZERO).await;
    let record = Record::new("1", "Francisco", "francisco@email.com");

    assert_eq!(client.add_user(record.clone()).await.unwrap(), record);
}

#[tokio::test]
async fn server_stream_delivers_every_update() {
    let (client, _) = client(Mode::Echo, Duration::ZERO).await;
    let mut statuses = Vec::new();

    let received = client
        .add_user_verbose(
            Record::new("1", "Francisco", "francisco@email.com"),
            |resp| statuses.push(resp.status.clone()),
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(received, 3);
    assert_eq!(statuses, ["Init", "Inserting", "User has been inserted"]);
}

#[tokio::test]
async fn client_stream_returns_the_aggregate() {
    let (mut client, config) = client(Mode::Echo, Duration::from_millis(1)).await;

    let users = client
        .add_users(
            config.records.clone(),
            config.driver.send_interval,
            config.driver.outbound_buffer_size,
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(users, config.records);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_stream_rejection_reports_the_service_status() {
    let (mut client, _) = client(Mode::RejectBatch, Duration::ZERO).await;
    let records: Vec<Record> = (0..2000)
        .map(|i| Record::new(i.to_string(), format!("user-{i}"), format!("user-{i}@email.com")))
        .collect();

    // The service drops the request stream as soon as it answers, which
    // races the send loop; the status must win every time.
    for _ in 0..20 {
        let res = client
            .add_users(records.clone(), Duration::ZERO, 1, CancellationToken::new())
            .await;
        match res {
            Err(Error::Reception { code, .. }) => assert_eq!(code, Code::InvalidArgument),
            other => panic!("unexpected result: {other:?}"),
        }
    }
}

#[tokio::test]
async fn bidi_echo_completes_after_every_reply() {
    let (res, seen) = run_bidi(Mode::Echo, Duration::from_millis(1)).await;

    assert_eq!(
        res.unwrap(),
        Completion {
            records_sent: 6,
            responses_received: 6,
        }
    );
    assert_eq!(
        seen,
        ["Francisco", "Chuck", "Henrique", "Mike", "Marpin", "Doug"]
    );
}

#[tokio::test]
async fn bidi_replies_held_until_half_close_arrive_in_service_order() {
    let (res, seen) = run_bidi(Mode::HoldAndReverse, Duration::from_millis(1)).await;

    assert_eq!(res.unwrap().responses_received, 6);
    assert_eq!(
        seen,
        ["Doug", "Marpin", "Mike", "Henrique", "Chuck", "Francisco"]
    );
}

#[tokio::test]
async fn bidi_service_failure_surfaces_as_reception_fault() {
    let (res, seen) = run_bidi(Mode::FailAfter(2), Duration::from_millis(100)).await;

    match res {
        Err(Error::Reception { code, .. }) => assert_eq!(code, Code::ResourceExhausted),
        other => panic!("unexpected result: {other:?}"),
    }
    assert_eq!(seen, ["Francisco", "Chuck"]);
}

#[tokio::test]
async fn unreachable_endpoint_is_a_connect_fault() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = config(format!("http://{addr}"), Duration::ZERO);
    match UserClient::connect(&config).await {
        Err(Error::Connect { .. }) => {}
        other => panic!("unexpected result: {other:?}"),
    }
}
