// SerialBridge - UART Relay Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Device interrupt table (cortex-m-rt `device` feature).
//!
//! Every UART line gets a trampoline that looks up the engine bound to it and
//! services it. All other lines fall through to `DefaultHandler`.

use serial_bridge::hal::PeripheralId;

extern "C" {
    fn DefaultHandler();
}

#[derive(Clone, Copy)]
#[repr(transparent)]
pub struct Vector {
    pub handler: unsafe extern "C" fn(),
}

macro_rules! uart_vectors {
    ($($name:ident => $id:ident),* $(,)?) => {
        $(
            unsafe extern "C" fn $name() {
                crate::service(PeripheralId::$id);
            }
        )*
    };
}

uart_vectors! {
    uart0 => Uart0,
    uart1 => Uart1,
    uart2 => Uart2,
    uart3 => Uart3,
    uart4 => Uart4,
    uart5 => Uart5,
    uart6 => Uart6,
    uart7 => Uart7,
}

const LINES: usize = 64;

#[link_section = ".vector_table.interrupts"]
#[no_mangle]
pub static __INTERRUPTS: [Vector; LINES] = {
    let mut table = [Vector {
        handler: DefaultHandler,
    }; LINES];
    table[5] = Vector { handler: uart0 };
    table[6] = Vector { handler: uart1 };
    table[33] = Vector { handler: uart2 };
    table[59] = Vector { handler: uart3 };
    table[60] = Vector { handler: uart4 };
    table[61] = Vector { handler: uart5 };
    table[62] = Vector { handler: uart6 };
    table[63] = Vector { handler: uart7 };
    table
};
