#![allow(dead_code)]

use bitcode::{Decode, Encode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tandem::channel::InMemoryChannel;
use tandem::codec::{
    ByteReader, ByteWriter, CodecError, RpcScalar, SerializationCtx, SerializerRegistry,
};
use tandem::lifetime::LifetimeDefinition;
use tandem::scheduler::SingleThreadScheduler;
use tandem_rpc_endpoint::{
    RpcEndpoint, RpcEndpointConfig, RpcError, RpcList, RpcTask, rpc_contract,
};

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct AColor {
    pub r: i32,
    pub g: i32,
    pub b: i32,
}

/// Case-insensitive path; always travels lower-cased.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSystemPath(pub String);

impl RpcScalar for FileSystemPath {
    fn read(_ctx: &SerializationCtx, reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(FileSystemPath(reader.read_string()?))
    }

    fn write(
        _ctx: &SerializationCtx,
        writer: &mut ByteWriter,
        value: &Self,
    ) -> Result<(), CodecError> {
        writer.write_string(&value.0.to_lowercase())
    }
}

/// Has no serializer in any registry built here.
#[derive(Debug, Clone)]
pub struct Opaque;

rpc_contract! {
    /// Exercises every member kind.
    pub contract SampleService {
        interface: SampleApi,
        proxy: SampleProxy,
        lists {
            history: String;
        }
        sync {
            fn concat(a: String, b: String, c: String) -> String;
            fn query_color() -> AColor;
            fn fail_sync(message: String) -> u32;
            fn panic_sync() -> u32;
            fn slow_sync(millis: u64) -> u32;
        }
        async {
            fn get_string_async() -> String;
            fn notify_async() -> ();
            fn b_sum(a: u8, b: u8) -> u8;
            fn us_sum(a: u16, b: u16) -> u16;
            fn s_sum(a: i16, b: i16) -> i16;
            fn i_sum(a: i32, b: i32) -> i32;
            fn ui_sum(a: u32, b: u32) -> u32;
            fn l_sum(a: i64, b: i64) -> i64;
            fn ul_sum(a: u64, b: u64) -> u64;
            fn stall_async() -> u32;
        }
        oneway {
            fn set_path(path: FileSystemPath);
        }
    }
}

rpc_contract! {
    /// Never bound by any test.
    pub contract UnservedService {
        interface: UnservedApi,
        proxy: UnservedProxy,
        lists {}
        sync {
            fn ping() -> u32;
        }
        async {}
        oneway {
            fn poke();
        }
    }
}

rpc_contract! {
    pub contract OpaqueService {
        interface: OpaqueApi,
        proxy: OpaqueProxy,
        lists {}
        sync {
            fn echo(value: Opaque) -> u32;
        }
        async {}
        oneway {}
    }
}

/// Same contract name as `SampleService`, with a member it never had.
pub mod newer {
    use tandem_rpc_endpoint::rpc_contract;

    rpc_contract! {
        pub contract SampleService {
            interface: SampleApi,
            proxy: SampleProxy,
            lists {}
            sync {
                fn brand_new() -> u32;
            }
            async {}
            oneway {}
        }
    }
}

#[derive(Default)]
pub struct SampleImpl {
    pub history: RpcList<String>,
    pub last_path: Mutex<Option<FileSystemPath>>,
    pub notified: AtomicUsize,
    pub stalled: Mutex<Vec<RpcTask<u32>>>,
}

impl SampleImpl {
    /// Completes every call parked by `stall_async`.
    pub fn release_stalled(&self, value: u32) {
        let stalled: Vec<_> = self.stalled.lock().unwrap().drain(..).collect();
        for task in stalled {
            task.set_result(value);
        }
    }
}

impl SampleApi for SampleImpl {
    fn history(&self) -> &RpcList<String> {
        &self.history
    }

    fn concat(&self, a: String, b: String, c: String) -> Result<String, RpcError> {
        let joined = format!("{}{}{}", a, b, c);
        self.history.push(joined.clone())?;
        Ok(joined)
    }

    fn query_color(&self) -> Result<AColor, RpcError> {
        Ok(AColor {
            r: 10,
            g: 20,
            b: 30,
        })
    }

    fn fail_sync(&self, message: String) -> Result<u32, RpcError> {
        Err(RpcError::RemoteFault { message })
    }

    fn panic_sync(&self) -> Result<u32, RpcError> {
        panic!("kaboom")
    }

    fn slow_sync(&self, millis: u64) -> Result<u32, RpcError> {
        std::thread::sleep(Duration::from_millis(millis));
        Ok(1)
    }

    fn get_string_async(&self) -> RpcTask<String> {
        RpcTask::from_result("result".to_string())
    }

    fn notify_async(&self) -> RpcTask<()> {
        self.notified.fetch_add(1, Ordering::SeqCst);
        RpcTask::from_result(())
    }

    fn b_sum(&self, a: u8, b: u8) -> RpcTask<u8> {
        RpcTask::from_result(a.wrapping_add(b))
    }

    fn us_sum(&self, a: u16, b: u16) -> RpcTask<u16> {
        RpcTask::from_result(a.wrapping_add(b))
    }

    fn s_sum(&self, a: i16, b: i16) -> RpcTask<i16> {
        RpcTask::from_result(a.wrapping_add(b))
    }

    fn i_sum(&self, a: i32, b: i32) -> RpcTask<i32> {
        RpcTask::from_result(a.wrapping_add(b))
    }

    fn ui_sum(&self, a: u32, b: u32) -> RpcTask<u32> {
        RpcTask::from_result(a.wrapping_add(b))
    }

    fn l_sum(&self, a: i64, b: i64) -> RpcTask<i64> {
        RpcTask::from_result(a.wrapping_add(b))
    }

    fn ul_sum(&self, a: u64, b: u64) -> RpcTask<u64> {
        RpcTask::from_result(a.wrapping_add(b))
    }

    fn stall_async(&self) -> RpcTask<u32> {
        let task = RpcTask::new();
        self.stalled.lock().unwrap().push(task.clone());
        task
    }

    fn set_path(&self, path: FileSystemPath) -> Result<(), RpcError> {
        *self.last_path.lock().unwrap() = Some(path);
        Ok(())
    }
}

pub struct OpaqueImpl;

impl OpaqueApi for OpaqueImpl {
    fn echo(&self, _value: Opaque) -> Result<u32, RpcError> {
        Ok(0)
    }
}

pub fn registry() -> Arc<SerializerRegistry> {
    let mut registry = SerializerRegistry::new();
    registry
        .register::<AColor, _, _>(
            |_, reader| {
                let bytes = reader.read_bytes()?;
                bitcode::decode::<AColor>(&bytes)
                    .map_err(|e| CodecError::InvalidData(e.to_string()))
            },
            |_, writer, value| writer.write_bytes(&bitcode::encode(value)),
        )
        .register_scalar::<FileSystemPath>();
    Arc::new(registry)
}

/// Two endpoints joined by an in-memory channel, each with its own
/// scheduler and scope.
pub struct Connection {
    pub server: RpcEndpoint,
    pub client: RpcEndpoint,
    pub server_scope: LifetimeDefinition,
    pub client_scope: LifetimeDefinition,
}

impl Connection {
    pub fn open() -> Self {
        let registry = registry();
        let (server_channel, client_channel) = InMemoryChannel::pair();

        let server_scope = LifetimeDefinition::new("server");
        let client_scope = LifetimeDefinition::new("client");

        let server = RpcEndpoint::new(
            RpcEndpointConfig::new("server"),
            &server_scope.lifetime(),
            Arc::new(SingleThreadScheduler::spawn("server").unwrap()),
            Arc::new(server_channel),
            registry.clone(),
        );
        let client = RpcEndpoint::new(
            RpcEndpointConfig::new("client"),
            &client_scope.lifetime(),
            Arc::new(SingleThreadScheduler::spawn("client").unwrap()),
            Arc::new(client_channel),
            registry,
        );

        Self {
            server,
            client,
            server_scope,
            client_scope,
        }
    }

    /// Binds a fresh `SampleImpl` for the server's whole lifetime and
    /// activates a matching proxy on the client.
    pub fn sample(&self) -> (Arc<SampleImpl>, SampleProxy) {
        let implementation = Arc::new(SampleImpl::default());
        self.server
            .bind::<SampleService>(&self.server_scope.lifetime(), implementation.clone())
            .unwrap();
        let proxy = self
            .client
            .activate_proxy::<SampleService>(&self.client_scope.lifetime())
            .unwrap();
        (implementation, proxy)
    }

    /// Waits until both schedulers have drained everything in flight,
    /// including work the other side queued while this side was running.
    pub fn wait_messages(&self) {
        for _ in 0..100 {
            let server_idle = self.server.scheduler().wait_idle(IDLE_TIMEOUT);
            let client_idle = self.client.scheduler().wait_idle(IDLE_TIMEOUT);
            if server_idle
                && client_idle
                && self.server.scheduler().is_idle()
                && self.client.scheduler().is_idle()
            {
                return;
            }
        }
        panic!("endpoints did not settle");
    }
}
