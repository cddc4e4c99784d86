// Copyright 2018-2026 the Deno authors. MIT license.

use std::any::type_name;
use std::cell::Cell;
use std::cell::RefCell;
use std::error::Error;
use std::fmt;
use std::fmt::Display;
use std::fmt::Formatter;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::Context;
use std::task::Poll;
use std::task::Waker;

use deno_error::JsErrorBox;
use futures::future::FusedFuture;
use pin_project::pin_project;
use slab::Slab;

/// Shared cancellation signal for every wait begun on behalf of one timer.
///
/// Once canceled a handle stays canceled; futures bound to it afterwards
/// resolve to [`Canceled`] without polling their inner future.
#[derive(Debug, Default)]
pub struct CancelHandle {
  canceled: Cell<bool>,
  /// One slot per pending [`Cancelable`] that has been polled at least once.
  wakers: RefCell<Slab<Waker>>,
}

impl CancelHandle {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn new_rc() -> Rc<Self> {
    Rc::new(Self::new())
  }

  /// Cancel all cancelable futures that are bound to this handle. Note that
  /// this method does not require a mutable reference to the `CancelHandle`.
  pub fn cancel(&self) {
    if self.canceled.replace(true) {
      return;
    }
    let wakers = std::mem::take(&mut *self.wakers.borrow_mut());
    for (_, waker) in wakers {
      waker.wake();
    }
  }

  pub fn is_canceled(&self) -> bool {
    self.canceled.get()
  }

  /// Number of pending futures currently registered with this handle.
  pub fn registered(&self) -> usize {
    self.wakers.borrow().len()
  }
}

/// Links one [`Cancelable`] to its handle. The waker slot is released when
/// the future completes, is canceled or is dropped.
#[derive(Debug)]
pub struct Registration {
  handle: Rc<CancelHandle>,
  key: Option<usize>,
}

impl Registration {
  fn new(handle: Rc<CancelHandle>) -> Self {
    Self { handle, key: None }
  }

  fn update_waker(&mut self, waker: &Waker) {
    let mut wakers = self.handle.wakers.borrow_mut();
    if let Some(key) = self.key {
      if let Some(registered) = wakers.get_mut(key) {
        if !registered.will_wake(waker) {
          *registered = waker.clone();
        }
        return;
      }
    }
    self.key = Some(wakers.insert(waker.clone()));
  }
}

impl Drop for Registration {
  fn drop(&mut self) {
    // After `cancel()` the slab has been emptied and nothing registers again,
    // so a stale key cannot hit another future's slot.
    if let Some(key) = self.key.take() {
      self.handle.wakers.borrow_mut().try_remove(key);
    }
  }
}

#[pin_project(project = CancelableProjection)]
#[derive(Debug)]
pub enum Cancelable<F> {
  Pending {
    #[pin]
    future: F,
    registration: Registration,
  },
  Terminated,
}

impl<F: Future> Cancelable<F> {
  fn new(future: F, handle: Rc<CancelHandle>) -> Self {
    Self::Pending {
      future,
      registration: Registration::new(handle),
    }
  }
}

impl<F: Future> Future for Cancelable<F> {
  type Output = Result<F::Output, Canceled>;

  fn poll(mut self: Pin<&mut Self>, cx: &mut Context) -> Poll<Self::Output> {
    let poll_result = match self.as_mut().project() {
      CancelableProjection::Pending {
        future,
        registration,
      } => {
        // Check for cancellation _before_ polling the inner future. If it has
        // already been canceled the inner future will not be polled.
        if registration.handle.is_canceled() {
          Poll::Ready(Err(Canceled))
        } else {
          match future.poll(cx) {
            Poll::Ready(res) => Poll::Ready(Ok(res)),
            Poll::Pending => {
              registration.update_waker(cx.waker());
              Poll::Pending
            }
          }
        }
      }
      CancelableProjection::Terminated => {
        panic!("{}::poll() called after completion", type_name::<Self>())
      }
    };
    // Fuse: dropping the `Pending` variant drops `registration`, which frees
    // this future's waker slot on the handle.
    if poll_result.is_ready() {
      self.set(Cancelable::Terminated)
    }
    poll_result
  }
}

impl<F: Future> FusedFuture for Cancelable<F> {
  fn is_terminated(&self) -> bool {
    matches!(self, Self::Terminated)
  }
}

pub trait CancelFuture
where
  Self: Future + Sized,
{
  // Returns a [`Canceled`] error if the handle is canceled.
  fn or_cancel(self, cancel_handle: Rc<CancelHandle>) -> Cancelable<Self> {
    Cancelable::new(self, cancel_handle)
  }
}

impl<F> CancelFuture for F where F: Future {}

#[derive(Copy, Clone, Default, Debug, Eq, Hash, PartialEq)]
pub struct Canceled;

impl Display for Canceled {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "operation canceled")
  }
}

impl Error for Canceled {}

impl From<Canceled> for JsErrorBox {
  fn from(value: Canceled) -> Self {
    JsErrorBox::from_err(value)
  }
}

impl deno_error::JsErrorClass for Canceled {
  fn get_class(&self) -> std::borrow::Cow<'static, str> {
    "Interrupted".into()
  }

  fn get_message(&self) -> std::borrow::Cow<'static, str> {
    self.to_string().into()
  }

  fn get_additional_properties(&self) -> deno_error::AdditionalProperties {
    Box::new(std::iter::empty())
  }

  fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
    self
  }
}
