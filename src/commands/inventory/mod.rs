pub mod receive_stock_command;
