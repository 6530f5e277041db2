/// Declares a remotely callable contract.
///
/// One invocation generates:
///
/// - the interface trait, implemented by the real service and by the proxy;
/// - a marker type implementing [`RpcContract`](crate::RpcContract), with one
///   `u64` id constant per member;
/// - the proxy struct, which forwards every method over its endpoint.
///
/// Members are grouped by how the caller waits for them. `sync` members block
/// and return `Result<R, RpcError>`. `async` members return an
/// [`RpcTask<R>`](crate::RpcTask) at once (a `()` result makes them "async
/// void"). `oneway` members get no response at all. `lists` are replicated
/// [`RpcList<T>`](crate::RpcList) properties. All four sections must be
/// present, but any of them may be empty.
///
/// ```rust,no_run
/// use tandem_rpc_endpoint::rpc_contract;
///
/// rpc_contract! {
///     pub contract Notebook {
///         interface: NotebookApi,
///         proxy: NotebookProxy,
///         lists {
///             pages: String;
///         }
///         sync {
///             fn page_count() -> u32;
///         }
///         async {
///             fn word_count(page: u32) -> u64;
///         }
///         oneway {
///             fn touch(page: u32);
///         }
///     }
/// }
/// ```
#[macro_export]
macro_rules! rpc_contract {
    (
        $(#[$meta:meta])*
        $vis:vis contract $contract:ident {
            interface: $interface:ident,
            proxy: $proxy:ident,
            lists {
                $($list:ident : $list_ty:ty;)*
            }
            sync {
                $(fn $sync_fn:ident($($sync_arg:ident : $sync_arg_ty:ty),* $(,)?) -> $sync_ret:ty;)*
            }
            async {
                $(fn $async_fn:ident($($async_arg:ident : $async_arg_ty:ty),* $(,)?) -> $async_ret:ty;)*
            }
            oneway {
                $(fn $oneway_fn:ident($($oneway_arg:ident : $oneway_arg_ty:ty),* $(,)?);)*
            }
        }
    ) => {
        $(#[$meta])*
        $vis struct $contract;

        $vis trait $interface: Send + Sync + 'static {
            $(
                fn $list(&self) -> &$crate::RpcList<$list_ty>;
            )*
            $(
                fn $sync_fn(&self, $($sync_arg: $sync_arg_ty),*) -> ::std::result::Result<$sync_ret, $crate::RpcError>;
            )*
            $(
                fn $async_fn(&self, $($async_arg: $async_arg_ty),*) -> $crate::RpcTask<$async_ret>;
            )*
            $(
                fn $oneway_fn(&self, $($oneway_arg: $oneway_arg_ty),*) -> ::std::result::Result<(), $crate::RpcError>;
            )*
        }

        #[allow(non_upper_case_globals)]
        impl $contract {
            $(
                pub const $list: u64 = $crate::tandem::rpc::member_id_hash(
                    concat!(stringify!($contract), ".", stringify!($list)),
                );
            )*
            $(
                pub const $sync_fn: u64 = $crate::tandem::rpc::member_id_hash(
                    concat!(stringify!($contract), ".", stringify!($sync_fn)),
                );
            )*
            $(
                pub const $async_fn: u64 = $crate::tandem::rpc::member_id_hash(
                    concat!(stringify!($contract), ".", stringify!($async_fn)),
                );
            )*
            $(
                pub const $oneway_fn: u64 = $crate::tandem::rpc::member_id_hash(
                    concat!(stringify!($contract), ".", stringify!($oneway_fn)),
                );
            )*
        }

        impl $crate::RpcContract for $contract {
            type Interface = dyn $interface;
            type Proxy = $proxy;

            const NAME: &'static str = stringify!($contract);
            const CONTRACT_ID: u64 = $crate::tandem::rpc::member_id_hash(stringify!($contract));

            fn members() -> ::std::vec::Vec<$crate::RpcMemberDescriptor> {
                ::std::vec![
                    $(
                        $crate::RpcMemberDescriptor::list::<$list_ty>(
                            stringify!($list),
                            Self::$list,
                        ),
                    )*
                    $(
                        $crate::RpcMemberDescriptor::call::<($($sync_arg_ty,)*), $sync_ret>(
                            stringify!($sync_fn),
                            Self::$sync_fn,
                            $crate::tandem::rpc::RpcCallKind::Sync,
                        ),
                    )*
                    $(
                        $crate::RpcMemberDescriptor::call::<($($async_arg_ty,)*), $async_ret>(
                            stringify!($async_fn),
                            Self::$async_fn,
                            $crate::tandem::rpc::RpcCallKind::for_async_result::<$async_ret>(),
                        ),
                    )*
                    $(
                        $crate::RpcMemberDescriptor::oneway::<($($oneway_arg_ty,)*)>(
                            stringify!($oneway_fn),
                            Self::$oneway_fn,
                        ),
                    )*
                ]
            }

            #[allow(unused_variables, unused_mut)]
            fn dispatch_table(
                implementation: ::std::sync::Arc<Self::Interface>,
            ) -> $crate::RpcDispatchTable {
                let mut table = $crate::RpcDispatchTable::new();
                $(
                    let target = ::std::sync::Arc::clone(&implementation);
                    table.sync::<($($sync_arg_ty,)*), $sync_ret, _>(
                        Self::$sync_fn,
                        move |($($sync_arg,)*)| target.$sync_fn($($sync_arg),*),
                    );
                )*
                $(
                    let target = ::std::sync::Arc::clone(&implementation);
                    table.asynchronous::<($($async_arg_ty,)*), $async_ret, _>(
                        Self::$async_fn,
                        move |($($async_arg,)*)| target.$async_fn($($async_arg),*),
                    );
                )*
                $(
                    let target = ::std::sync::Arc::clone(&implementation);
                    table.oneway::<($($oneway_arg_ty,)*), _>(
                        Self::$oneway_fn,
                        move |($($oneway_arg,)*)| target.$oneway_fn($($oneway_arg),*),
                    );
                )*
                table
            }

            #[allow(unused_variables)]
            fn bind_lists(
                implementation: &Self::Interface,
                binder: &mut $crate::RpcListBinder<'_>,
            ) -> ::std::result::Result<(), $crate::RpcError> {
                $(
                    binder.link(Self::$list, implementation.$list())?;
                )*
                Ok(())
            }

            fn create_proxy(
                core: $crate::RpcProxyCore,
            ) -> ::std::result::Result<Self::Proxy, $crate::RpcError> {
                Ok($proxy {
                    $(
                        $list: core.list::<$list_ty>(Self::$list)?,
                    )*
                    core,
                })
            }
        }

        /// Caller-side implementation that forwards every member over an
        /// endpoint.
        $vis struct $proxy {
            core: $crate::RpcProxyCore,
            $(
                $list: $crate::RpcList<$list_ty>,
            )*
        }

        impl $proxy {
            pub fn core(&self) -> &$crate::RpcProxyCore {
                &self.core
            }
        }

        impl $interface for $proxy {
            $(
                fn $list(&self) -> &$crate::RpcList<$list_ty> {
                    &self.$list
                }
            )*
            $(
                fn $sync_fn(&self, $($sync_arg: $sync_arg_ty),*) -> ::std::result::Result<$sync_ret, $crate::RpcError> {
                    self.core.call_sync::<_, $sync_ret>($contract::$sync_fn, ($($sync_arg,)*))
                }
            )*
            $(
                fn $async_fn(&self, $($async_arg: $async_arg_ty),*) -> $crate::RpcTask<$async_ret> {
                    self.core.call_async::<_, $async_ret>($contract::$async_fn, ($($async_arg,)*))
                }
            )*
            $(
                fn $oneway_fn(&self, $($oneway_arg: $oneway_arg_ty),*) -> ::std::result::Result<(), $crate::RpcError> {
                    self.core.call_oneway($contract::$oneway_fn, ($($oneway_arg,)*))
                }
            )*
        }
    };
}
